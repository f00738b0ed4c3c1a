// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::io;

use displaydoc::Display;
use thiserror::Error;

/// Errors of the offline evaluation.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// Failed to read or write a file: {0}
    Io(#[from] io::Error),
    /// Failed to read or write csv: {0}
    Csv(#[from] csv::Error),
    /// Invalid evaluation configuration: {0}
    Config(#[from] crate::config::Error),
}
