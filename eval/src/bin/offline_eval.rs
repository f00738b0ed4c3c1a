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

//! Evaluates the recommendation strategies on a ratings file and reports their metrics.

use anyhow::Error;
use tracing::info;
use wallrec_eval::{config, logging, Config};

fn main() -> Result<(), Error> {
    let config: Config = config::load(["WALLREC_EVAL"]);
    logging::initialize_global(&config.logging)?;

    let report = wallrec_eval::run(&config)?;
    println!("{report}");
    if let Some(dir) = &config.report.dir {
        let path = report.write_csv(dir)?;
        info!(path = %path.display(), "wrote report");
    }

    Ok(())
}
