use crate::file_format::FileFormat;
use crate::{Zone, ZoneCatalogFile};
use failure::Error;
use std::path::Path;

// Stream zones from a json lines reader
fn read_zones(
    reader: impl std::io::BufRead,
) -> impl std::iter::Iterator<Item = Result<Zone, Error>> {
    reader
        .lines()
        .map(|l| l.map_err(|e| failure::err_msg(e.to_string())))
        .filter(|l| l.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|l| {
            l.and_then(|l| serde_json::from_str(&l).map_err(|e| failure::err_msg(e.to_string())))
        })
}

fn from_json_stream(reader: impl std::io::BufRead) -> Result<ZoneCatalogFile, Error> {
    let zones: Vec<Zone> = read_zones(reader).collect::<Result<_, _>>()?;

    Ok(ZoneCatalogFile {
        meta: crate::CatalogMetadata {
            stats: zones.iter().collect(),
            ..Default::default()
        },
        zones,
    })
}

/// Load a zone catalog from a file
pub fn load_catalog_from_file(input: impl AsRef<Path>) -> Result<ZoneCatalogFile, Error> {
    let format = FileFormat::from_filename(input.as_ref())?;
    let f = std::fs::File::open(&input)?;
    let f = std::io::BufReader::new(f);
    load_catalog(f, format)
}

/// Return an iterator on the zones
/// if the input file is a json stream, the zones are streamed
/// if the input file is a json, the whole catalog is loaded
pub fn read_zones_from_file(
    input: impl AsRef<Path>,
) -> Result<Box<dyn std::iter::Iterator<Item = Result<Zone, Error>>>, Error> {
    let format = FileFormat::from_filename(input.as_ref())?;
    let f = std::fs::File::open(input.as_ref())?;
    let f = std::io::BufReader::new(f);
    match format {
        FileFormat::JsonGz | FileFormat::Json => {
            let catalog = load_catalog(f, format)?;
            Ok(Box::new(catalog.zones.into_iter().map(Ok)))
        }
        FileFormat::JsonStream => Ok(Box::new(read_zones(f))),
        FileFormat::JsonStreamGz => {
            let r = flate2::bufread::GzDecoder::new(f);
            let r = std::io::BufReader::new(r);
            Ok(Box::new(read_zones(r)))
        }
    }
}

/// Load a zone catalog from a reader and a file format
pub fn load_catalog(
    reader: impl std::io::BufRead,
    format: FileFormat,
) -> Result<ZoneCatalogFile, Error> {
    match format {
        FileFormat::JsonGz => {
            let r = flate2::bufread::GzDecoder::new(reader);
            serde_json::from_reader(r).map_err(|e| failure::err_msg(e.to_string()))
        }
        FileFormat::Json => {
            serde_json::from_reader(reader).map_err(|e| failure::err_msg(e.to_string()))
        }
        FileFormat::JsonStream => from_json_stream(reader),
        FileFormat::JsonStreamGz => {
            let r = flate2::bufread::GzDecoder::new(reader);
            let r = std::io::BufReader::new(r);
            from_json_stream(r)
        }
    }
}
