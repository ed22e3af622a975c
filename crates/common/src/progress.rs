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

/// Reporting sink for long-running computations surfaced to the user.
///
/// Workers bracket every potentially slow operation with
/// `start`/`finish` and may post intermediate messages in between.
/// Implementations must tolerate calls from arbitrary worker threads.
pub trait Progress: Send + Sync {
    /// A long-running operation began.
    fn start(&self);

    /// Human-readable status update for an operation in flight.
    fn message(&self, text: &str);

    /// The operation ended, successfully or not.
    fn finish(&self);
}

/// Progress sink that swallows all reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&self) {}

    fn message(&self, _text: &str) {}

    fn finish(&self) {}
}
