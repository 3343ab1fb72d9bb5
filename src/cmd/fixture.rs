use std::fs::File;
use std::path::Path;

use crate::domain::error::FixtureError;
use crate::domain::fixture::Fixture;
use crate::io::{self, reader};

/// Loads a fixture file (format chosen by extension) and validates it.
pub fn load_fixture(path: &Path) -> Result<Fixture, FixtureError> {
    let format =
        io::resolve_input_format(None, Some(path)).map_err(|source| FixtureError::ResolveFormat {
            path: path.display().to_string(),
            source,
        })?;
    let file = File::open(path).map_err(|source| FixtureError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let value = reader::read_value(file, format)
        .map_err(|source| FixtureError::Read { format, source })?;
    let fixture: Fixture =
        serde_json::from_value(value).map_err(|error| FixtureError::Schema(error.to_string()))?;
    fixture.validate().map_err(FixtureError::Invalid)?;
    Ok(fixture)
}
