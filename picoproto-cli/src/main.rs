use std::collections::VecDeque;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::ops::Deref;
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;

use picoproto::{BufferMode, DecodeOptions, Message};

mod env;
mod graph_def;

use env::env_flag;
use graph_def::Graph;

struct Args {
    /// Serialized `GraphDef` file to read.
    input: String,

    /// File to write the DOT graph to. Defaults to stdout.
    output: Option<String>,

    /// Print decoding diagnostics to stderr.
    verbose: bool,
}

fn parse_args() -> Result<Args, lexopt::Error> {
    use lexopt::prelude::*;

    let mut values = VecDeque::new();
    let mut output = None;
    let mut verbose = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Value(val) => values.push_back(val.string()?),
            Short('o') | Long("output") => output = Some(parser.value()?.string()?),
            Short('v') | Long("verbose") => verbose = true,
            Short('h') | Long("help") => {
                println!(
                    "Convert a TensorFlow GraphDef into a Graphviz DOT graph.

Usage: {bin_name} [OPTIONS] <graph.pb>

  -o, --output <file>  Write the graph to <file> instead of stdout
  -v, --verbose        Print decoding diagnostics
  -h, --help           Print help

Verbose output can also be enabled by setting PICOPROTO_VERBOSE=1.
",
                    bin_name = parser.bin_name().unwrap_or("picoproto-dot")
                );
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    let input = values.pop_front().ok_or("missing `<graph.pb>` arg")?;

    Ok(Args {
        input,
        output,
        verbose: verbose || env_flag("PICOPROTO_VERBOSE", false),
    })
}

/// Contents of the input file.
enum Storage {
    #[cfg(feature = "mmap")]
    Mmap(Mmap),
    Buffer(Vec<u8>),
}

impl Storage {
    #[cfg(feature = "mmap")]
    fn load(path: &Path) -> io::Result<Storage> {
        let file = File::open(path)?;

        // Safety: The file is only read, and is expected not to be modified
        // by other processes while the tool runs.
        let mmap = unsafe { Mmap::map(&file) }?;
        Ok(Storage::Mmap(mmap))
    }

    #[cfg(not(feature = "mmap"))]
    fn load(path: &Path) -> io::Result<Storage> {
        fs::read(path).map(Storage::Buffer)
    }
}

impl Deref for Storage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(feature = "mmap")]
            Storage::Mmap(mmap) => mmap,
            Storage::Buffer(buf) => buf,
        }
    }
}

/// Read an input that may be empty.
///
/// Memory-mapping a zero-length file fails on some platforms, so such files
/// are read normally.
fn load_input(path: &Path) -> io::Result<Storage> {
    if fs::metadata(path)?.len() == 0 {
        return Ok(Storage::Buffer(Vec::new()));
    }
    Storage::load(path)
}

/// Tool which renders the node graph of a serialized TensorFlow `GraphDef`
/// in Graphviz DOT format.
///
/// Malformed or truncated input is not fatal. The nodes which were decoded
/// before the problem are rendered and a warning is printed.
fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args()?;
    let storage = load_input(Path::new(&args.input))?;

    let mut graph_def = Message::with_options(DecodeOptions {
        mode: BufferMode::Borrow,
        ..Default::default()
    });
    if let Err(err) = graph_def.parse_from_bytes(&storage) {
        eprintln!(
            "Warning: failed to decode {}: {}. Output may be incomplete.",
            args.input, err
        );
    }

    let graph = Graph::from_message(&graph_def);

    if args.verbose {
        eprintln!(
            "Decoded {} nodes from {} bytes",
            graph.nodes.len(),
            storage.len()
        );
        if graph_def.ignored_occurrences() > 0 {
            eprintln!(
                "Ignored {} field occurrences with conflicting wire types",
                graph_def.ignored_occurrences()
            );
        }
        for warning in &graph.warnings {
            eprintln!("Node {}: {}", warning.index, warning.message);
        }
    }

    match args.output {
        Some(path) => graph.write_dot(BufWriter::new(File::create(path)?))?,
        None => graph.write_dot(io::stdout().lock())?,
    }

    Ok(())
}
