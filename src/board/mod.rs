//! Board model, match finding and move resolution.

pub mod matching;
pub mod resolve;
pub mod spawn;
pub mod types;

pub use matching::{find_all_matches, find_valid_swaps, has_valid_move, would_swap_match};
pub use resolve::{ClearOutcome, MoveOutcome};
pub use spawn::{TileSampler, TileWeights};
pub use types::{
    Blocker, Board, BoardSize, Cell, Match, Orientation, Slot, SpecialType, SwapAction, Tile,
    TileType,
};
