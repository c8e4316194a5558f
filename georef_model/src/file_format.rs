use failure::Error;
use std::path::Path;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum FileFormat {
    Json,
    JsonGz,
    JsonStream,
    JsonStreamGz,
}

static ALL_EXTENSIONS: [(&str, FileFormat); 4] = [
    (".json", FileFormat::Json),
    (".jsonl", FileFormat::JsonStream),
    (".json.gz", FileFormat::JsonGz),
    (".jsonl.gz", FileFormat::JsonStreamGz),
];

impl FileFormat {
    pub fn from_filename(filename: impl AsRef<Path>) -> Result<FileFormat, Error> {
        ALL_EXTENSIONS
            .iter()
            .find(|(e, _)| {
                filename
                    .as_ref()
                    .file_name()
                    .and_then(|f| f.to_str())
                    .map_or(false, |f| f.ends_with(e))
            })
            .map(|(_, f)| *f)
            .ok_or_else(|| {
                let extensions_str = ALL_EXTENSIONS
                    .iter()
                    .map(|(e, _)| *e)
                    .collect::<Vec<_>>()
                    .join(", ");
                failure::err_msg(format!(
                    "Unable to detect the file format from filename '{}'. \
                     Accepted extensions are: {}",
                    filename.as_ref().display(),
                    extensions_str
                ))
            })
    }

    pub fn is_stream(self) -> bool {
        matches!(self, FileFormat::JsonStream | FileFormat::JsonStreamGz)
    }

    pub fn is_gzipped(self) -> bool {
        matches!(self, FileFormat::JsonGz | FileFormat::JsonStreamGz)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(FileFormat::from_filename("zones.json").unwrap(), FileFormat::Json);
        assert_eq!(
            FileFormat::from_filename("/tmp/zones.jsonl.gz").unwrap(),
            FileFormat::JsonStreamGz
        );
        assert!(FileFormat::from_filename("zones.jsonl").unwrap().is_stream());
        assert!(FileFormat::from_filename("zones.json.gz").unwrap().is_gzipped());
    }

    #[test]
    fn unknown_extension() {
        let err = FileFormat::from_filename("zones.bad").unwrap_err();
        assert!(err.to_string().contains("Unable to detect the file format"));
    }
}
