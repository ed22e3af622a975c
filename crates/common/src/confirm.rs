// Heapscope
// Copyright (C) 2025 Heapscope Contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

/// Asks the user to approve an expensive operation before it starts.
///
/// Heap-wide value precomputation (retained sizes and the like) can
/// take minutes on large snapshots, so the engine asks exactly once
/// per computation through this gate. `remember_key` identifies the
/// question for embeddings that offer a "do not ask again" option.
pub trait ConfirmationGate: Send + Sync {
    /// Returns true if the user approved the operation.
    fn confirm(&self, question: &str, remember_key: &str) -> bool;
}

/// Gate that approves every request without user interaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl ConfirmationGate for AlwaysConfirm {
    fn confirm(&self, _question: &str, _remember_key: &str) -> bool {
        true
    }
}
