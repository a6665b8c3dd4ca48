//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of utf7-codec.
//
// utf7-codec is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// utf7-codec is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// utf7-codec. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use log::{debug, error, info};
use structopt::StructOpt;

use crate::codec::profile::Profile;
use crate::codec::registry;
use crate::codec::stream::{DecodeReader, EncodeWriter};
use crate::support::config::{MalformedPolicy, TranscodeConfig};
use crate::support::sysexits::*;

/// Convert text to and from UTF-7 and IMAP modified UTF-7.
///
/// Only the canonical form of UTF-7 is produced or accepted: every shift run
/// is minimal and explicitly terminated, so each text has exactly one
/// encoding.
#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Command {
    /// Read defaults from this TOML file.
    ///
    /// Recognised keys are `variant`, `charset`, `malformed` ("fail" or
    /// "replace") and `buffer_size`. Command line options take precedence.
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Configure logging with this log4rs TOML file instead of writing
    /// warnings to standard error.
    #[structopt(long, parse(from_os_str))]
    log_config: Option<PathBuf>,

    /// Log more detail to standard error. Can be given multiple times.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    #[structopt(subcommand)]
    action: Action,
}

#[derive(StructOpt)]
enum Action {
    /// Encode text into UTF-7.
    ///
    /// All inputs are treated as one continuous text.
    Encode(TranscodeOptions),
    /// Decode UTF-7 into text.
    ///
    /// Each input is decoded as a separate UTF-7 document, and the results are
    /// written to standard output in order. Malformed UTF-7 stops the process
    /// unless `--lenient` is given.
    Decode(DecodeSubcommand),
    /// List the supported UTF-7 variants and their aliases.
    List,
}

#[derive(StructOpt)]
struct TranscodeOptions {
    /// The UTF-7 variant, e.g. UTF-7, X-UTF-7-OPTIONAL, X-MODIFIED-UTF-7
    /// [default: UTF-7]
    #[structopt(long, short)]
    variant: Option<String>,

    /// The charset of the text side, as a WHATWG label [default: UTF-8]
    #[structopt(long, short)]
    charset: Option<String>,

    /// The files to read. "-" reads from stdin.
    #[structopt(parse(from_os_str), default_value = "-")]
    inputs: Vec<PathBuf>,
}

#[derive(StructOpt)]
struct DecodeSubcommand {
    #[structopt(flatten)]
    common: TranscodeOptions,

    /// Replace malformed UTF-7 with U+FFFD instead of failing.
    #[structopt(long)]
    lenient: bool,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    init_log(cmd.log_config.as_deref(), cmd.verbose);

    let mut config = match cmd.config {
        None => TranscodeConfig::default(),
        Some(ref path) => match TranscodeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error in config file at '{}': {}", path.display(), e);
                EX_CONFIG.exit()
            }
        },
    };

    match cmd.action {
        Action::List => list(),
        Action::Encode(options) => {
            let (profile, charset) = apply_options(&mut config, &options);
            encode(&config, profile, charset, &options.inputs);
        }
        Action::Decode(cmd) => {
            let (profile, charset) = apply_options(&mut config, &cmd.common);
            if cmd.lenient {
                config.malformed = MalformedPolicy::Replace;
            }
            decode(&config, profile, charset, &cmd.common.inputs);
        }
    }
}

fn init_log(log_config: Option<&Path>, verbose: u8) {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;
    use log4rs::filter::threshold::ThresholdFilter;

    if let Some(path) = log_config {
        if let Err(e) =
            log4rs::init_file(path, log4rs::file::Deserializers::new())
        {
            eprintln!(
                "Failed to load logging config '{}': {}",
                path.display(),
                e
            );
            EX_CONFIG.exit();
        }
        return;
    }

    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S%.3f)} [{l}][{t}] {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("stderr", Box::new(stderr)),
        )
        .build(Root::builder().appender("stderr").build(level));

    // If this fails, there's nowhere to report it to except stderr, and
    // transcoding works just as well without logs.
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("Failed to initialise logging: {}", e);
            }
        }
        Err(e) => eprintln!("Failed to initialise logging: {}", e),
    }
}

/// Fold the command line options into `config` and resolve the variant and
/// charset.
fn apply_options(
    config: &mut TranscodeConfig,
    options: &TranscodeOptions,
) -> (&'static Profile, &'static Encoding) {
    if let Some(ref variant) = options.variant {
        config.variant = variant.clone();
    }
    if let Some(ref charset) = options.charset {
        config.charset = charset.clone();
    }

    // A bad name given on the command line is a usage error; one that came
    // from the config file is a configuration error.
    let bad_name_exit = |from_flag: bool| {
        if from_flag {
            EX_USAGE
        } else {
            EX_CONFIG
        }
    };

    let profile = match config.profile() {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("{}; try `utf7 list`", e);
            bad_name_exit(options.variant.is_some()).exit()
        }
    };

    let charset = match config.charset() {
        Ok(charset) => charset,
        Err(e) => {
            eprintln!("{}", e);
            bad_name_exit(options.charset.is_some()).exit()
        }
    };

    info!("Using {} with charset {}", profile.name(), charset.name());
    (profile, charset)
}

fn list() {
    for profile in &registry::variants() {
        println!("{}", profile.name());
        for alias in profile.aliases() {
            println!("    {}", alias);
        }
    }
}

fn open(path: &Path) -> Box<dyn Read> {
    if Path::new("-") == path {
        return Box::new(io::stdin());
    }

    match fs::File::open(path) {
        Ok(file) => Box::new(file),
        Err(e) => {
            eprintln!("Failed to open '{}': {}", path.display(), e);
            EX_NOINPUT.exit()
        }
    }
}

fn fail(what: &Path, e: io::Error) -> ! {
    error!("Transcoding '{}' failed: {}", what.display(), e);
    eprintln!("{}: {}", what.display(), e);
    Sysexit::for_io_error(&e).exit()
}

fn encode(
    config: &TranscodeConfig,
    profile: &Profile,
    charset: &'static Encoding,
    inputs: &[PathBuf],
) {
    let stdout = io::stdout();
    let mut writer =
        EncodeWriter::new(profile, charset, io::BufWriter::new(stdout.lock()))
            .with_buffer_size(config.buffer_size);

    for input in inputs {
        debug!("Encoding '{}'", input.display());
        let mut reader = open(input);
        if let Err(e) = io::copy(&mut reader, &mut writer) {
            fail(input, e);
        }
    }

    if let Err(e) = writer.finish() {
        fail(inputs.last().map_or(Path::new("-"), PathBuf::as_path), e);
    }
}

fn decode(
    config: &TranscodeConfig,
    profile: &Profile,
    charset: &'static Encoding,
    inputs: &[PathBuf],
) {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for input in inputs {
        debug!("Decoding '{}'", input.display());
        let mut reader =
            DecodeReader::new(profile, charset, config.malformed, open(input))
                .with_buffer_size(config.buffer_size);
        if let Err(e) = io::copy(&mut reader, &mut out) {
            fail(input, e);
        }
    }

    if let Err(e) = out.flush() {
        fail(Path::new("-"), e);
    }
}
