#[macro_use]
extern crate log;
use failure::{Error, ResultExt};
use flate2::write::GzEncoder;
use flate2::Compression;
use georef::document::{georeference_document, DocumentId, MemoryDocumentStore};
use georef::file_format::FileFormat;
use georef::{
    build_resolver, catalog_file, GeoreferenceRequest, GeoreferenceResolver, GeoreferenceResult,
    MemoryZoneStore, ZoneCatalogFile, ZoneId,
};
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
struct Args {
    /// GeoJSON file of the municipal boundary.
    #[structopt(short = "b", long = "boundary", parse(from_os_str))]
    boundary: PathBuf,
    #[structopt(
        short = "z",
        long = "zones",
        parse(from_os_str),
        help = r#"Zone catalog file. It is loaded if it exists and the created zones are written back.
Format will be deduced from the file extension.
Accepted extensions are '.json', '.json.gz', '.jsonl', '.jsonl.gz'
'jsonl' is json stream, each line is a zone as json
"#
    )]
    zones: Option<PathBuf>,
    #[structopt(
        short = "i",
        long = "input",
        parse(from_os_str),
        help = r#"Location requests, one json per line.
Each line has the fields of a request ('zoneID', 'coordinates' or 'latitude'/'longitude')
and optionally the 'document' it locates.
Requests are resolved concurrently, a line cannot rely on the outcome of a previous one.
The results are written in the order of the requests.
"#
    )]
    input: PathBuf,
    /// output file name, one json result per request line
    #[structopt(
        short = "o",
        long = "output",
        default_value = "georeferences.jsonl",
        parse(from_os_str)
    )]
    output: PathBuf,
    #[structopt(help = "Do not display the stats", long = "no-stats")]
    no_stats: bool,
}

#[derive(Deserialize, Debug)]
struct RequestLine {
    #[serde(default)]
    document: Option<DocumentId>,
    #[serde(flatten)]
    request: GeoreferenceRequest,
}

#[derive(Serialize, Debug)]
struct Failure {
    kind: &'static str,
    message: String,
}

#[derive(Serialize, Debug)]
struct ResultLine {
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<GeoreferenceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orphaned_zone: Option<ZoneId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Failure>,
}

impl ResultLine {
    fn failed(line: usize, document: Option<DocumentId>, kind: &'static str, message: String) -> Self {
        ResultLine {
            line,
            document,
            result: None,
            orphaned_zone: None,
            error: Some(Failure { kind, message }),
        }
    }
}

fn read_requests(input: &Path) -> Result<Vec<(usize, String)>, Error> {
    let file = File::open(input).context(format!("impossible to open {}", input.display()))?;
    let mut lines = vec![];
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if !line.trim().is_empty() {
            lines.push((idx + 1, line));
        }
    }
    Ok(lines)
}

fn resolve_line(
    resolver: &GeoreferenceResolver<MemoryZoneStore>,
    documents: &MemoryDocumentStore,
    line: usize,
    content: &str,
) -> ResultLine {
    let RequestLine { document, request } = match serde_json::from_str(content) {
        Ok(r) => r,
        Err(e) => {
            warn!("line {} is not a valid request: {}", line, e);
            return ResultLine::failed(line, None, "invalid_request", e.to_string());
        }
    };
    let outcome = match document {
        Some(doc) => georeference_document(resolver, documents, doc, request)
            .map(|g| (g.result, g.orphaned_zone)),
        None => resolver.resolve_request(request).map(|r| (r, None)),
    };
    match outcome {
        Ok((result, orphaned_zone)) => ResultLine {
            line,
            document,
            result: Some(result),
            orphaned_zone,
            error: None,
        },
        Err(e) => {
            debug!("line {} refused: {}", line, e);
            ResultLine::failed(line, document, e.kind(), e.to_string())
        }
    }
}

fn serialize_catalog(catalog: &ZoneCatalogFile, output_file: &Path) -> Result<(), Error> {
    let format = FileFormat::from_filename(output_file)?;
    info!("writing the zone catalog {}", output_file.display());
    let file = File::create(output_file)?;
    let mut stream = BufWriter::new(file);
    match format {
        FileFormat::JsonGz => {
            let mut e = GzEncoder::new(stream, Compression::default());
            serde_json::to_writer(&mut e, catalog)?;
            e.finish()?.flush()?;
        }
        FileFormat::Json => {
            serde_json::to_writer(&mut stream, catalog)?;
            stream.flush()?;
        }
        FileFormat::JsonStream => {
            to_json_stream(&mut stream, catalog)?;
            stream.flush()?;
        }
        FileFormat::JsonStreamGz => {
            let mut e = GzEncoder::new(stream, Compression::default());
            to_json_stream(&mut e, catalog)?;
            e.finish()?.flush()?;
        }
    };
    Ok(())
}

fn to_json_stream(mut writer: impl Write, catalog: &ZoneCatalogFile) -> Result<(), Error> {
    for z in &catalog.zones {
        serde_json::to_writer(&mut writer, z)?;
        writer.write_all(b"\n")?;
    }

    // the metadata are not part of a json stream, we log them
    info!("metadata: {:?}", &catalog.meta);
    Ok(())
}

fn georef(args: Args) -> Result<(), Error> {
    // fail before resolving anything if the catalog cannot be written back
    if let Some(ref zones) = args.zones {
        FileFormat::from_filename(zones)?;
    }
    let resolver = build_resolver(&args.boundary, args.zones.as_ref().map(|p| p.as_path()))?;
    let documents = MemoryDocumentStore::new();

    let requests = read_requests(&args.input)?;
    info!("resolving {} requests", requests.len());
    let results: Vec<ResultLine> = requests
        .into_par_iter()
        .map(|(line, content)| resolve_line(&resolver, &documents, line, &content))
        .collect();

    let refused = results.iter().filter(|r| r.error.is_some()).count();
    info!(
        "{} requests resolved, {} refused",
        results.len() - refused,
        refused
    );

    let file = File::create(&args.output)
        .context(format!("impossible to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    for r in &results {
        serde_json::to_writer(&mut writer, r)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    let catalog = catalog_file(resolver.catalog())?;
    if let Some(ref zones) = args.zones {
        serialize_catalog(&catalog, zones)?;
    }

    if !args.no_stats {
        info!(
            "Statistics for {}:\n{}",
            catalog.meta.municipality, catalog.meta.stats
        );
    }
    Ok(())
}

fn init_logger() {
    let mut builder = env_logger::Builder::new();
    builder.filter(None, log::LevelFilter::Info);
    if let Ok(s) = std::env::var("RUST_LOG") {
        builder.parse(&s);
    }
    builder.init();
}

fn main() {
    init_logger();
    let args = Args::from_args();
    if let Err(e) = georef(args) {
        error!("georef in error! {:?}", e);
        e.iter_chain().for_each(|c| {
            error!("{}", c);
            if let Some(b) = c.backtrace() {
                error!("  - {}", b);
            }
        });

        std::process::exit(1);
    }
}
