//! Instance files and the loaders that resolve instance names to networks.
//!
//! The file format is line based:
//!
//! ```text
//! <header line 1>
//! <header line 2>
//! <header line 3>
//! <source> <sink> <variable cost> <fixed cost>   (repeated)
//! S
//! <source> <supply>                              (repeated)
//! D
//! <sink> <demand>                                (repeated)
//! END
//! ```
//!
//! Malformed lines are skipped with a warning; they never fail a load.

use crate::graph::network::{FlowNetwork, VertexId};
use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// File extension of instance files in a data directory.
pub const INSTANCE_EXTENSION: &str = "DAT";

const HEADER_LINES: usize = 3;

/// Errors that prevent an instance from being loaded at all.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("cannot read instance '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error reading instance data: {0}")]
    Read(#[from] io::Error),
    #[error("unknown instance '{0}'")]
    Unknown(String),
    #[error("invalid instance name '{0}'")]
    InvalidName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Edges,
    Supply,
    Demand,
}

/// Parse an instance from any buffered reader.
pub fn parse_instance<R: BufRead>(reader: R) -> Result<FlowNetwork, InstanceError> {
    let mut network = FlowNetwork::new();
    let mut section = Section::Edges;

    for (number, bytes) in reader.split(b'\n').enumerate() {
        let bytes = bytes?;
        if number < HEADER_LINES {
            continue;
        }
        let line = match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(_) => {
                warn!("Ignoring line {}, not UTF-8", number + 1);
                continue;
            }
        };
        trace!(">> {}", line.trim_end());

        let trimmed = line.trim();
        match trimmed {
            "S" => {
                section = Section::Supply;
                continue;
            }
            "D" => {
                section = Section::Demand;
                continue;
            }
            "END" => break,
            _ => {}
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        match section {
            Section::Edges => match parse_edge(&fields) {
                Some((source, sink, vcost, fcost)) => {
                    let edge = network.new_edge(source, sink, vcost, fcost);
                    trace!("New Edge: {}", edge);
                }
                None => warn!("Ignoring line {}, no edge: {:?}", number + 1, line),
            },
            Section::Supply => match parse_capacity(&fields) {
                Some((id, size)) => {
                    let vertex = network.set_source_capacity(id, size);
                    trace!("Supply: {}", vertex);
                }
                None => warn!("Ignoring line {}, no supply: {:?}", number + 1, line),
            },
            Section::Demand => match parse_capacity(&fields) {
                Some((id, size)) => {
                    let vertex = network.set_sink_capacity(id, size);
                    trace!("Demand: {}", vertex);
                }
                None => warn!("Ignoring line {}, no demand: {:?}", number + 1, line),
            },
        }
    }

    Ok(network)
}

fn parse_edge(fields: &[&str]) -> Option<(VertexId, VertexId, f64, f64)> {
    if fields.len() < 4 {
        return None;
    }
    Some((
        fields[0].parse().ok()?,
        fields[1].parse().ok()?,
        fields[2].parse().ok()?,
        fields[3].parse().ok()?,
    ))
}

fn parse_capacity(fields: &[&str]) -> Option<(VertexId, f64)> {
    if fields.len() < 2 {
        return None;
    }
    Some((fields[0].parse().ok()?, fields[1].parse().ok()?))
}

/// Load an instance file from disk.
pub fn load_instance(path: impl AsRef<Path>) -> Result<FlowNetwork, InstanceError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| InstanceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_instance(BufReader::new(file))
}

/// Render a network in the instance file format.
pub fn write_instance<W: Write>(
    network: &FlowNetwork,
    title: &str,
    mut out: W,
) -> io::Result<()> {
    writeln!(out, "{}", title)?;
    writeln!(
        out,
        "{} {} {}",
        network.source_count(),
        network.sink_count(),
        network.edge_count()
    )?;
    writeln!(out, "EDGES")?;
    for edge in network.edges() {
        writeln!(
            out,
            "{} {} {} {}",
            edge.source, edge.sink, edge.variable_cost, edge.fixed_cost
        )?;
    }
    writeln!(out, "S")?;
    for source in network.sources() {
        writeln!(out, "{} {}", source.id, source.capacity)?;
    }
    writeln!(out, "D")?;
    for sink in network.sinks() {
        writeln!(out, "{} {}", sink.id, sink.capacity)?;
    }
    writeln!(out, "END")
}

/// Resolves instance names to freshly loaded networks.
pub trait InstanceLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<FlowNetwork, InstanceError>;

    /// Every instance name this loader can resolve.
    fn names(&self) -> Result<Vec<String>, InstanceError>;
}

/// Loads `<name>.DAT` files from a data directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    data_path: PathBuf,
}

impl DirectoryLoader {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Instance names are bare file stems; anything that would leave the
    /// data directory is rejected.
    fn path_for(&self, name: &str) -> Result<PathBuf, InstanceError> {
        let separator = |c: char| c == '/' || c == '\\';
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !name.contains(separator) => {
                Ok(self.data_path.join(format!("{}.{}", name, INSTANCE_EXTENSION)))
            }
            _ => Err(InstanceError::InvalidName(name.to_string())),
        }
    }
}

impl InstanceLoader for DirectoryLoader {
    fn load(&self, name: &str) -> Result<FlowNetwork, InstanceError> {
        load_instance(self.path_for(name)?)
    }

    fn names(&self) -> Result<Vec<String>, InstanceError> {
        let entries = fs::read_dir(&self.data_path).map_err(|source| InstanceError::Io {
            path: self.data_path.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_instance = path
                .extension()
                .map_or(false, |ext| ext == INSTANCE_EXTENSION);
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_instance => names.push(stem.to_string()),
                _ => info!("Ignoring {}", path.display()),
            }
        }
        names.sort();
        debug!("Found {} instances in {}", names.len(), self.data_path.display());
        Ok(names)
    }
}

/// Serves a fixed set of prebuilt networks.
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    data: HashMap<String, FlowNetwork>,
}

impl StaticLoader {
    pub fn new(data: HashMap<String, FlowNetwork>) -> Self {
        Self { data }
    }

    pub fn with(mut self, name: impl Into<String>, network: FlowNetwork) -> Self {
        self.data.insert(name.into(), network);
        self
    }
}

impl InstanceLoader for StaticLoader {
    fn load(&self, name: &str) -> Result<FlowNetwork, InstanceError> {
        self.data
            .get(name)
            .cloned()
            .ok_or_else(|| InstanceError::Unknown(name.to_string()))
    }

    fn names(&self) -> Result<Vec<String>, InstanceError> {
        let mut names: Vec<String> = self.data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
