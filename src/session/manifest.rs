//! Audio-pair manifest: the fixed block/pair structure of a session.
//!
//! The manifest is generated deterministically from the configured
//! `total_blocks × pairs_per_block` at session creation and never mutated
//! afterwards.  Clips are located by the path convention
//! `<assets_dir>/block<N>/{original|shadowing}_<M>.<ext>`; the manifest does
//! not check that the files exist — a missing clip surfaces later as a
//! playback warning, not an error.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{AudioConfig, SessionConfig};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// 1-based (block, pair) cursor into the manifest.
///
/// Positions advance in row-major order — pair first, then block — and the
/// derived ordering matches traversal order (field order is significant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Block number, `1..=total_blocks`.
    pub block: u32,
    /// Pair number within the block, `1..=pairs_per_block`.
    pub pair: u32,
}

impl Position {
    /// The starting position of every session.
    pub fn start() -> Self {
        Self { block: 1, pair: 1 }
    }

    /// Number of pairs completed before this position is reached.
    pub fn completed_pairs(&self, pairs_per_block: u32) -> u32 {
        (self.block - 1) * pairs_per_block + (self.pair - 1)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "B{}P{}", self.block, self.pair)
    }
}

// ---------------------------------------------------------------------------
// AudioPair
// ---------------------------------------------------------------------------

/// One original/shadowing clip combination to be rated.
///
/// Immutable once generated; identified by `B<block>P<pair>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPair {
    /// Path of the original recording.
    pub original: PathBuf,
    /// Path of the participant's shadowing attempt.
    pub shadowing: PathBuf,
    /// Stable identifier, `B<block>P<pair>`.
    pub id: String,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Ordered sequence of blocks, each an ordered sequence of [`AudioPair`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    blocks: Vec<Vec<AudioPair>>,
    total_blocks: u32,
    pairs_per_block: u32,
}

impl Manifest {
    /// Generate the full manifest from the configured session shape and
    /// clip location settings.
    pub fn generate(session: &SessionConfig, audio: &AudioConfig) -> Self {
        let mut blocks = Vec::with_capacity(session.total_blocks as usize);
        for block in 1..=session.total_blocks {
            let block_dir = audio.assets_dir.join(format!("block{block}"));
            let mut pairs = Vec::with_capacity(session.pairs_per_block as usize);
            for pair in 1..=session.pairs_per_block {
                pairs.push(AudioPair {
                    original: block_dir.join(format!("original_{pair}.{}", audio.clip_ext)),
                    shadowing: block_dir.join(format!("shadowing_{pair}.{}", audio.clip_ext)),
                    id: format!("B{block}P{pair}"),
                });
            }
            blocks.push(pairs);
        }
        Self {
            blocks,
            total_blocks: session.total_blocks,
            pairs_per_block: session.pairs_per_block,
        }
    }

    /// Number of blocks.
    pub fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    /// Number of pairs per block.
    pub fn pairs_per_block(&self) -> u32 {
        self.pairs_per_block
    }

    /// Total number of pairs across all blocks.
    pub fn total_pairs(&self) -> u32 {
        self.total_blocks * self.pairs_per_block
    }

    /// The pair at `pos`, or `None` when `pos` lies outside the manifest.
    pub fn pair_at(&self, pos: Position) -> Option<&AudioPair> {
        self.blocks
            .get(pos.block.checked_sub(1)? as usize)?
            .get(pos.pair.checked_sub(1)? as usize)
    }

    /// `true` iff `pos` is the last (block, pair) of the manifest.
    pub fn is_last(&self, pos: Position) -> bool {
        pos.block == self.total_blocks && pos.pair == self.pairs_per_block
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn manifest(total_blocks: u32, pairs_per_block: u32) -> Manifest {
        let session = SessionConfig {
            total_blocks,
            pairs_per_block,
            break_secs: 60,
        };
        Manifest::generate(&session, &AudioConfig::default())
    }

    #[test]
    fn generates_expected_shape() {
        let m = manifest(10, 5);
        assert_eq!(m.total_blocks(), 10);
        assert_eq!(m.pairs_per_block(), 5);
        assert_eq!(m.total_pairs(), 50);
        for block in 1..=10 {
            for pair in 1..=5 {
                assert!(m.pair_at(Position { block, pair }).is_some());
            }
        }
    }

    #[test]
    fn ids_are_unique_and_match_position() {
        let m = manifest(4, 3);
        let mut seen = HashSet::new();
        for block in 1..=4 {
            for pair in 1..=3 {
                let p = m.pair_at(Position { block, pair }).unwrap();
                assert_eq!(p.id, format!("B{block}P{pair}"));
                assert!(seen.insert(p.id.clone()), "duplicate id {}", p.id);
            }
        }
        assert_eq!(seen.len(), 12);
    }

    #[test]
    fn paths_follow_convention() {
        let m = manifest(2, 2);
        let p = m.pair_at(Position { block: 2, pair: 1 }).unwrap();
        assert_eq!(p.original, PathBuf::from("audio/block2/original_1.flac"));
        assert_eq!(p.shadowing, PathBuf::from("audio/block2/shadowing_1.flac"));
    }

    #[test]
    fn clip_ext_is_configurable() {
        let session = SessionConfig {
            total_blocks: 1,
            pairs_per_block: 1,
            break_secs: 60,
        };
        let audio = AudioConfig {
            clip_ext: "mp3".into(),
            ..AudioConfig::default()
        };
        let m = Manifest::generate(&session, &audio);
        let p = m.pair_at(Position::start()).unwrap();
        assert_eq!(p.original, PathBuf::from("audio/block1/original_1.mp3"));
    }

    #[test]
    fn out_of_range_lookup_is_none() {
        let m = manifest(2, 2);
        assert!(m.pair_at(Position { block: 3, pair: 1 }).is_none());
        assert!(m.pair_at(Position { block: 1, pair: 3 }).is_none());
        assert!(m.pair_at(Position { block: 0, pair: 1 }).is_none());
    }

    #[test]
    fn is_last_only_at_final_pair() {
        let m = manifest(2, 2);
        assert!(!m.is_last(Position::start()));
        assert!(!m.is_last(Position { block: 2, pair: 1 }));
        assert!(m.is_last(Position { block: 2, pair: 2 }));
    }

    #[test]
    fn position_ordering_is_row_major() {
        let a = Position { block: 1, pair: 2 };
        let b = Position { block: 2, pair: 1 };
        assert!(a < b);
        assert!(Position::start() < a);
        assert_eq!(b.completed_pairs(5), 5);
        assert_eq!(Position::start().completed_pairs(5), 0);
    }

    #[test]
    fn position_displays_as_id() {
        assert_eq!(Position { block: 3, pair: 4 }.to_string(), "B3P4");
    }
}
