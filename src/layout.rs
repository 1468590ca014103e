//! Workspace-scan algorithm: which workspace goes into which grid tile.
//!
//! Tiles are numbered row-major, `index = row * N + col`.  Adjacent tiles
//! always hold adjacent workspaces under the active walk policy (plain id
//! order, or existing workspaces only when `skip_empty` is set).  When the
//! walk wraps around before the grid is full, the remaining tiles stay
//! unassigned (`None`) rather than repeating an id.

use crate::config::WorkspaceMethod;
use crate::traits::{Compositor, WorkspaceId};
use log::debug;

/// Assign a workspace (or nothing) to each of the `side * side` tiles.
///
/// In [`Start`](WorkspaceMethod::Start) mode the anchor workspace is created
/// on `output` if it does not exist yet.
pub fn scan_workspaces<C: Compositor + ?Sized>(
    compositor: &mut C,
    output: &str,
    method: WorkspaceMethod,
    side: usize,
    skip_empty: bool,
) -> Vec<Option<WorkspaceId>> {
    let count = side * side;
    let mut tiles = vec![None; count];

    match method {
        WorkspaceMethod::Center(start) => {
            // Walk backwards until the ids stop decreasing (wrap) or half the
            // grid is filled, so that `start` lands in the middle tile.
            let mut first = start;
            let mut backtracked: i64 = 0;
            for i in 1..=(count / 2) as i64 {
                match compositor.relative_workspace(start, -i, skip_empty) {
                    Some(id) if id < first => {
                        backtracked += 1;
                        first = id;
                    }
                    _ => break,
                }
            }

            for (i, tile) in tiles.iter_mut().enumerate() {
                let offset = i as i64 - backtracked;
                let Some(id) = compositor.relative_workspace(start, offset, skip_empty) else {
                    break;
                };
                if offset >= 0 && i > 0 && id <= first {
                    debug!("workspace walk wrapped at tile {}", i);
                    break;
                }
                *tile = Some(id);
            }
        }
        WorkspaceMethod::Start(start) => {
            if !compositor.workspace_exists(start) {
                compositor.create_workspace(output, start);
            }
            tiles[0] = Some(start);

            for (i, tile) in tiles.iter_mut().enumerate().skip(1) {
                match compositor.relative_workspace(start, i as i64, skip_empty) {
                    Some(id) if id > start => *tile = Some(id),
                    _ => {
                        debug!("workspace walk wrapped at tile {}", i);
                        break;
                    }
                }
            }
        }
    }

    tiles
}

/// Index of the first tile holding `id`.
pub fn tile_of(tiles: &[Option<WorkspaceId>], id: WorkspaceId) -> Option<usize> {
    tiles.iter().position(|t| *t == Some(id))
}
