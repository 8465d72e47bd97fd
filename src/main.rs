use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use classmerge_cli::config::{
	MergedSettings, SETTINGS_FILE_NAME, discover_settings, generate_init_template,
	load_merged_settings, user_settings_path,
};
use classmerge_cli::emit::{class_to_json, config_to_json, render_class, render_config, render_file};
use classmerge_cli::logging::init_logging;
use classmerge_cli::resolve::ResolvedConfig;
use classmerge_cli::select::{ClassSelector, select_classes};
use classmerge_cli::{pipeline, rapify};

#[derive(Parser)]
#[command(name = "classmerge")]
#[command(
	author,
	version,
	about = "Preprocess, parse and resolve class-inheritance configs"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Create a template .classmerge.toml in the current directory
	#[arg(long)]
	init: bool,

	/// Overwrite existing .classmerge.toml when using --init
	#[arg(long, requires = "init")]
	force: bool,

	/// Increase log verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,

	/// Additional include directory, searched before configured ones
	#[arg(short = 'I', long = "include-dir", value_name = "DIR", global = true)]
	include_dirs: Vec<PathBuf>,

	/// Predefine a macro
	#[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]", global = true)]
	defines: Vec<String>,

	/// Treat unexpanded macro statements as errors
	#[arg(long, global = true)]
	strict: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the preprocessed source
	Preprocess {
		/// Root config file
		file: PathBuf,
	},
	/// Parse and resolve a file, then report counts and diagnostics
	Check {
		/// Root config file
		file: PathBuf,
	},
	/// Print resolved classes with all inherited fields applied
	Resolve {
		/// Root config file
		file: PathBuf,

		/// Only print the class at this `/`-separated path
		#[arg(long, value_name = "PATH")]
		class: Option<String>,

		/// Only print classes whose path matches this regex
		#[arg(long, value_name = "REGEX", conflicts_with = "class")]
		filter: Option<String>,

		/// Only print classes that inherit from this class
		#[arg(long, value_name = "NAME", conflicts_with = "class")]
		inherits: Option<String>,

		/// Output format
		#[arg(long, value_enum, default_value_t = Format::Text)]
		format: Format,
	},
	/// Print the inheritance chain of a class, nearest parent first
	Ancestors {
		/// Root config file
		file: PathBuf,

		/// `/`-separated class path
		path: String,
	},
	/// Encode a config file into the binary class database format
	Rapify {
		/// Root config file
		file: PathBuf,

		/// Output path for the binary database
		#[arg(short, long, value_name = "OUT")]
		output: PathBuf,
	},
	/// Decode a binary class database back to config text
	Derap {
		/// Binary database file
		file: PathBuf,
	},
	/// Settings management commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display the settings cascade and the merged result
	Show,
	/// Check all settings files for errors without loading any config
	Validate,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
	Text,
	Json,
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	if cli.init {
		return handle_init(cli.force);
	}

	let Some(command) = cli.command else {
		// Only flags were given, e.g. `classmerge -v`
		return Ok(ExitCode::SUCCESS);
	};

	let settings = || effective_settings(&cli.include_dirs, &cli.defines, cli.strict);

	match command {
		Commands::Config { action } => match action {
			ConfigAction::Show => handle_config_show(),
			ConfigAction::Validate => handle_config_validate(),
		},
		Commands::Preprocess { file } => handle_preprocess(&file, &settings()?),
		Commands::Check { file } => handle_check(&file, &settings()?),
		Commands::Resolve {
			file,
			class,
			filter,
			inherits,
			format,
		} => handle_resolve(
			&file,
			&settings()?,
			class.as_deref(),
			filter.as_deref(),
			inherits.as_deref(),
			format,
		),
		Commands::Ancestors { file, path } => handle_ancestors(&file, &settings()?, &path),
		Commands::Rapify { file, output } => handle_rapify(&file, &settings()?, &output),
		Commands::Derap { file } => handle_derap(&file),
	}
}

fn effective_settings(include_dirs: &[PathBuf], defines: &[String], strict: bool) -> Result<MergedSettings> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	let mut settings = load_merged_settings(&cwd).context("Failed to load settings")?;
	settings
		.apply_overrides(include_dirs, defines)
		.context("Invalid command-line define")?;
	settings.strict |= strict;
	Ok(settings)
}

fn handle_init(force: bool) -> Result<ExitCode> {
	let settings_path = PathBuf::from(SETTINGS_FILE_NAME);

	if settings_path.exists() && !force {
		anyhow::bail!("{SETTINGS_FILE_NAME} already exists. Use --force to overwrite.");
	}

	std::fs::write(&settings_path, generate_init_template())
		.with_context(|| format!("Failed to write {}", settings_path.display()))?;

	println!("Created {SETTINGS_FILE_NAME}");
	Ok(ExitCode::SUCCESS)
}

fn handle_preprocess(file: &Path, settings: &MergedSettings) -> Result<ExitCode> {
	let source = pipeline::preprocess(file, settings)
		.with_context(|| format!("Failed to preprocess {}", file.display()))?;
	print!("{}", source.text());
	Ok(ExitCode::SUCCESS)
}

fn load(file: &Path, settings: &MergedSettings) -> Result<(pipeline::Loaded, ResolvedConfig)> {
	pipeline::load(file, settings).with_context(|| format!("Failed to load {}", file.display()))
}

fn handle_check(file: &Path, settings: &MergedSettings) -> Result<ExitCode> {
	let (loaded, resolved) = load(file, settings)?;

	for diagnostic in &loaded.diagnostics {
		println!("warning: {}: {}", diagnostic.location, diagnostic.message);
	}

	let externals = resolved
		.walk()
		.iter()
		.filter(|(_, class)| class.is_external())
		.count();
	println!(
		"{}: {} files, {} class declarations, {} top-level classes, {} external, {} warnings",
		file.display(),
		loaded.source.files().len(),
		loaded.file.class_count(),
		resolved.len(),
		externals,
		loaded.diagnostics.len()
	);
	Ok(ExitCode::SUCCESS)
}

fn handle_resolve(
	file: &Path,
	settings: &MergedSettings,
	class: Option<&str>,
	filter: Option<&str>,
	inherits: Option<&str>,
	format: Format,
) -> Result<ExitCode> {
	let (_, resolved) = load(file, settings)?;

	if let Some(path) = class {
		let class = resolved.class(path)?;
		match format {
			Format::Text => print!("{}", render_class(class)),
			Format::Json => println!("{}", serde_json::to_string_pretty(&class_to_json(class))?),
		}
		return Ok(ExitCode::SUCCESS);
	}

	if filter.is_none() && inherits.is_none() {
		match format {
			Format::Text => print!("{}", render_config(&resolved)),
			Format::Json => println!("{}", serde_json::to_string_pretty(&config_to_json(&resolved))?),
		}
		return Ok(ExitCode::SUCCESS);
	}

	let selector = ClassSelector::new(filter, inherits).context("Invalid --filter pattern")?;
	let selected = select_classes(&resolved, &selector);
	match format {
		Format::Text => {
			for (path, class) in &selected {
				println!("// {path}");
				print!("{}", render_class(class));
			}
		}
		Format::Json => {
			let object: serde_json::Map<String, serde_json::Value> = selected
				.iter()
				.map(|(path, class)| (path.clone(), class_to_json(class)))
				.collect();
			println!("{}", serde_json::to_string_pretty(&object)?);
		}
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_ancestors(file: &Path, settings: &MergedSettings, path: &str) -> Result<ExitCode> {
	let (_, resolved) = load(file, settings)?;
	for ancestor in resolved.ancestors(path)? {
		println!("{ancestor}");
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_rapify(file: &Path, settings: &MergedSettings, output: &Path) -> Result<ExitCode> {
	let (loaded, _) = load(file, settings)?;
	let bytes = rapify::encode(&loaded.file)
		.with_context(|| format!("Failed to encode {}", file.display()))?;
	std::fs::write(output, &bytes)
		.with_context(|| format!("Failed to write {}", output.display()))?;

	println!("Wrote {} bytes to {}", bytes.len(), output.display());
	Ok(ExitCode::SUCCESS)
}

fn handle_derap(file: &Path) -> Result<ExitCode> {
	let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
	let decoded =
		rapify::decode(&bytes).with_context(|| format!("Failed to decode {}", file.display()))?;
	print!("{}", render_file(&decoded));
	Ok(ExitCode::SUCCESS)
}

fn handle_config_show() -> Result<ExitCode> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	let found = discover_settings(&cwd).context("Failed to discover settings files")?;

	if found.is_empty() {
		println!("No settings files found.");
	} else {
		println!("Settings files (in cascade order):\n");
		for loaded in &found {
			println!("# Source: {}", loaded.path.display());
			println!("# root: {}", loaded.settings.root);
			println!("# no-external-lookup: {}", loaded.settings.no_external_lookup);
			if let Some(ref env_var) = loaded.settings.root_config_lookup_disable_env_var {
				println!("# root-config-lookup-disable-env-var: {env_var}");
			}
			println!("# strict: {}", loaded.settings.strict);
			for dir in &loaded.settings.include_dirs {
				println!("  include-dir: {}", dir.display());
			}
			for (name, value) in &loaded.settings.defines {
				println!("  define: {name}={value}");
			}
			println!();
		}

		let merged = classmerge_cli::config::merge_settings(&found);
		println!("Effective settings:");
		println!("  strict: {}", merged.strict);
		for dir in &merged.include_dirs {
			println!("  include-dir: {}", dir.display());
		}
		for define in &merged.defines {
			println!(
				"  define: {}={} (from {})",
				define.name,
				define.value,
				define.source.display()
			);
		}
		println!();
	}

	if let Some(user_path) = user_settings_path() {
		println!("User settings path: {}", user_path.display());
		if user_path.exists() {
			println!("  (exists)");
		} else {
			println!("  (not found)");
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_config_validate() -> Result<ExitCode> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;

	match discover_settings(&cwd) {
		Ok(found) => {
			if found.is_empty() {
				println!("No settings files found.");
			} else {
				println!("All settings files are valid:");
				for loaded in &found {
					println!(
						"  {} ({} include dirs, {} defines)",
						loaded.path.display(),
						loaded.settings.include_dirs.len(),
						loaded.settings.defines.len()
					);
				}
			}
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Settings error: {e}");
			Ok(ExitCode::FAILURE)
		}
	}
}
