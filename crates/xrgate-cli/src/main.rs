//! xrgate CLI tools: variant listing, manifest inspection, config export,
//! launch simulation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use xrgate_common::LaunchConfig;
use xrgate_core::{
    launch_status, BootstrapState, Bootstrapper, LaunchManifest, LibraryLoader, NativeEntry,
    StepOutcome, Variant,
};
use xrgate_platform::{
    library_file_name, run_scripted, DylibEntry, DylibLoader, RecordingEntry, RecordingLoader,
    ScriptedHost,
};

#[derive(Parser, Debug)]
#[command(name = "xrgate")]
#[command(about = "xrgate CLI tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct Source {
    /// Built-in application variant (takes precedence over --config)
    #[arg(short, long)]
    variant: Option<String>,

    /// JSON launch configuration file
    #[arg(short, long, env = "XRGATE_CONFIG")]
    config: Option<PathBuf>,
}

impl Source {
    fn manifest(&self) -> Result<LaunchManifest> {
        match (&self.variant, &self.config) {
            (Some(name), _) => Ok(name.parse::<Variant>()?.manifest()),
            (None, Some(path)) => {
                let config = LaunchConfig::load(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Ok(LaunchManifest::from_config(&config)?)
            }
            (None, None) => bail!("either --variant or --config is required"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List built-in application variants
    Variants,

    /// Print a launch manifest as JSON
    Show {
        #[command(flatten)]
        source: Source,
    },

    /// Print a built-in variant as an editable JSON launch configuration
    Export {
        /// Built-in application variant
        variant: String,
    },

    /// Drive a full launch against a scripted permission host
    Simulate {
        #[command(flatten)]
        source: Source,

        /// Permission already granted before launch (repeatable)
        #[arg(short, long)]
        granted: Vec<String>,

        /// Permission the user denies when asked (repeatable)
        #[arg(short, long)]
        deny: Vec<String>,

        /// Load real libraries from this directory instead of recording names
        #[arg(long, env = "XRGATE_LIB_DIR")]
        lib_dir: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    app_name: String,
    outcome: StepOutcome,
    state: BootstrapState,
    requested: Vec<String>,
    host_finished: bool,
    status: String,
    dump: Option<String>,
}

fn simulate<L, N>(
    manifest: LaunchManifest,
    host: ScriptedHost,
    loader: L,
    entry: N,
) -> Result<SimulationReport>
where
    L: LibraryLoader,
    N: NativeEntry,
{
    let app_name = manifest.app_name.clone();
    let mut boot = Bootstrapper::new(manifest, host, loader, entry);
    let outcome = run_scripted(&mut boot)?;

    let mut dump = String::new();
    boot.dump(&mut dump)?;

    Ok(SimulationReport {
        app_name,
        outcome,
        state: boot.state(),
        requested: boot
            .host()
            .requests()
            .iter()
            .flatten()
            .map(|p| p.as_str().to_string())
            .collect(),
        host_finished: boot.host().is_finished(),
        status: launch_status(),
        dump: (!dump.is_empty()).then_some(dump),
    })
}

fn print_report(report: &SimulationReport) {
    println!("App:       {}", report.app_name);
    println!("Outcome:   {:?}", report.outcome);
    println!("State:     {}", report.state);
    if report.requested.is_empty() {
        println!("Requested: (none)");
    } else {
        println!("Requested: {}", report.requested.join(", "));
    }
    println!("Finished:  {}", report.host_finished);
    println!("Status:    {}", report.status);
    if let Some(dump) = &report.dump {
        print!("{dump}");
    }
}

fn main() -> Result<()> {
    xrgate_common::init_tracing_with_default("warn");

    let args = Args::parse();

    match args.command {
        Command::Variants => {
            for variant in Variant::ALL {
                let manifest = variant.manifest();
                println!(
                    "{:<24} {} ({} permission(s))",
                    variant.name(),
                    manifest.app_name,
                    manifest.permissions.len()
                );
            }
        }
        Command::Show { source } => {
            let manifest = source.manifest()?;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }
        Command::Export { variant } => {
            let config = variant.parse::<Variant>()?.manifest().to_config();
            println!("{}", config.to_json_pretty()?);
        }
        Command::Simulate {
            source,
            granted,
            deny,
            lib_dir,
            json,
        } => {
            let manifest = source.manifest()?;
            let host = granted
                .into_iter()
                .fold(ScriptedHost::new(), ScriptedHost::grant);
            let host = deny.into_iter().fold(host, ScriptedHost::deny_on_request);

            let report = match lib_dir {
                Some(dir) => {
                    let main_library = manifest
                        .libraries
                        .names()
                        .last()
                        .context("manifest lists no native libraries")?;
                    let entry = DylibEntry::new(dir.join(library_file_name(main_library)));
                    debug!("loading native libraries from {}", dir.display());
                    simulate(manifest, host, DylibLoader::new([dir]), entry)?
                }
                None => simulate(manifest, host, RecordingLoader::new(), RecordingEntry::new())?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Version => {
            println!("xrgate {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulate_with_repeated_flags() {
        let args = Args::try_parse_from([
            "xrgate",
            "simulate",
            "--variant",
            "body-face-eye-social",
            "-g",
            "com.oculus.permission.EYE_TRACKING",
            "-g",
            "android.permission.RECORD_AUDIO",
            "--deny",
            "com.oculus.permission.FACE_TRACKING",
            "--json",
        ])
        .unwrap();

        match args.command {
            Command::Simulate {
                source,
                granted,
                deny,
                lib_dir,
                json,
            } => {
                assert_eq!(source.variant.as_deref(), Some("body-face-eye-social"));
                assert_eq!(granted.len(), 2);
                assert_eq!(deny, vec!["com.oculus.permission.FACE_TRACKING"]);
                assert!(lib_dir.is_none());
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_export_variant() {
        let args = Args::try_parse_from(["xrgate", "export", "scene-model"]).unwrap();
        match args.command {
            Command::Export { variant } => assert_eq!(variant, "scene-model"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn variant_takes_precedence_over_config() {
        let source = Source {
            variant: Some("scene-model".into()),
            config: Some(PathBuf::from("/nonexistent/launch.json")),
        };
        let manifest = source.manifest().unwrap();
        assert_eq!(manifest.app_name, "XrSceneModel");
    }

    #[test]
    fn source_requires_variant_or_config() {
        let source = Source {
            variant: None,
            config: None,
        };
        assert!(source.manifest().is_err());

        let source = Source {
            variant: Some("not-a-variant".into()),
            config: None,
        };
        assert!(source.manifest().is_err());
    }

    #[test]
    fn simulate_denial_reports_termination() {
        let host = ScriptedHost::new().deny_on_request(xrgate_core::types::USE_SCENE);
        let report = simulate(
            Variant::SceneModel.manifest(),
            host,
            RecordingLoader::new(),
            RecordingEntry::new(),
        )
        .unwrap();

        assert_eq!(report.outcome, StepOutcome::Terminated);
        assert_eq!(report.state, BootstrapState::Terminated);
        assert!(report.host_finished);
        assert_eq!(report.requested, vec![xrgate_core::types::USE_SCENE]);
        assert!(report.dump.is_none());
    }

    #[test]
    fn simulate_emulator_includes_dump() {
        let report = simulate(
            Variant::ControllersEmulator.manifest(),
            ScriptedHost::new(),
            RecordingLoader::new(),
            RecordingEntry::new(),
        )
        .unwrap();

        assert_eq!(report.outcome, StepOutcome::Proceeded);
        let dump = report.dump.unwrap();
        assert!(dump.contains("CONTROLLER EMULATOR"));
        assert!(dump.contains("launches: 1"));
    }
}
