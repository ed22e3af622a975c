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

/// Represents an error inside the tree materialization engine.
///
/// None of these ever reach the embedding UI as a failure: provider
/// errors are caught at the scheduler boundary and degrade to an empty
/// child array, value computation errors degrade to the not-available
/// sentinel. They exist so internal layers can propagate causes with
/// `?` before the boundary swallows and logs them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("expansion scheduler is shut down")]
    SchedulerShutdown,

    #[error("node provider failed: {0}")]
    ProviderFailed(String),

    #[error("node provider panicked: {0}")]
    ProviderPanicked(String),

    #[error("value computation failed: {0}")]
    ValueComputationFailed(String),
}

/// Result type for engine operations.
pub type ModelResult<T> = Result<T, ModelError>;
