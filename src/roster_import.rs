// Player pool ingest from CSV.
//
// Columns: sn, first_name, middle_name, last_name, category, player_type,
// batting_role, bowling_role, wicket_keeper, province, base_price, image_url.
// Rows upsert by `sn`; auction fields of existing rows are never touched, so
// re-importing a corrected list mid-event is safe.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::model::Category;
use crate::store::{NewPlayer, Store};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {message}")]
    Row { line: u64, message: String },

    #[error("database error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Raw CSV row. Optional columns deserialize empty cells to `None`.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    sn: u32,
    first_name: String,
    #[serde(default)]
    middle_name: Option<String>,
    last_name: String,
    category: String,
    player_type: String,
    #[serde(default)]
    batting_role: Option<String>,
    #[serde(default)]
    bowling_role: Option<String>,
    #[serde(default)]
    wicket_keeper: Option<String>,
    province: String,
    base_price: i64,
    #[serde(default)]
    image_url: Option<String>,
}

/// Import players from a CSV file, upserting by sequence number.
/// Returns the number of rows written.
pub fn import_roster(store: &Store, path: &Path) -> Result<usize, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let imported = import_from_reader(store, file)?;
    info!(path = %path.display(), imported, "roster import complete");
    Ok(imported)
}

/// Reader-based import, exposed for testing without temp files.
pub fn import_from_reader<R: Read>(store: &Store, rdr: R) -> Result<usize, ImportError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut imported = 0;

    for (idx, result) in reader.deserialize::<RawPlayerRow>().enumerate() {
        // Header occupies line 1.
        let line = idx as u64 + 2;
        let raw = result.map_err(|e| ImportError::Row {
            line,
            message: e.to_string(),
        })?;
        let player = validate_row(raw, line)?;
        store.upsert_player(&player)?;
        imported += 1;
    }
    Ok(imported)
}

fn validate_row(raw: RawPlayerRow, line: u64) -> Result<NewPlayer, ImportError> {
    let row_err = |message: String| ImportError::Row { line, message };

    let first_name = raw.first_name.trim().to_string();
    let last_name = raw.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(row_err("first_name and last_name are required".into()));
    }

    let category = Category::from_code(&raw.category)
        .ok_or_else(|| row_err(format!("unknown category `{}`", raw.category)))?;

    if raw.base_price < 0 {
        return Err(row_err(format!("negative base_price {}", raw.base_price)));
    }

    let wicket_keeper = match raw.wicket_keeper.as_deref().map(str::trim) {
        None | Some("") => false,
        Some(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "1" => true,
            "false" | "no" | "0" => false,
            other => return Err(row_err(format!("bad wicket_keeper value `{other}`"))),
        },
    };

    Ok(NewPlayer {
        sn: raw.sn,
        first_name,
        middle_name: raw.middle_name.filter(|s| !s.trim().is_empty()),
        last_name,
        category,
        player_type: raw.player_type.trim().to_string(),
        batting_role: raw.batting_role.filter(|s| !s.trim().is_empty()),
        bowling_role: raw.bowling_role.filter(|s| !s.trim().is_empty()),
        wicket_keeper,
        province: raw.province.trim().to_string(),
        base_price: raw.base_price,
        image_url: raw.image_url.filter(|s| !s.trim().is_empty()),
    })
}
