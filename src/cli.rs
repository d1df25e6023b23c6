use crate::labels::{DEFAULT_BIC_COLUMN, DEFAULT_FIX_COLUMN};
use crate::model::MethodKey;
use crate::util::ExtensionFilter;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "methodmine")]
#[command(about = "Mine per-method metric histories from git into one CSV row per method")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Path to git repository")]
    pub repo: Option<PathBuf>,

    #[arg(long = "ext", global = true, help = "Allowed file extension, repeatable (default .cpp)")]
    pub extensions: Vec<String>,

    #[arg(long, global = true, help = "Newest commit to mine (default HEAD)")]
    pub from: Option<String>,

    #[arg(long, global = true, help = "Stop before this commit (exclusive oldest boundary)")]
    pub to: Option<String>,

    #[arg(long, global = true, help = "CSV file of bug-inducing commits")]
    pub bic: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = DEFAULT_BIC_COLUMN,
        help = "Hash column in the bug-inducing CSV"
    )]
    pub bic_column: String,

    #[arg(long, global = true, help = "CSV file of fixing commits")]
    pub fix: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = DEFAULT_FIX_COLUMN,
        help = "Hash column in the fix CSV"
    )]
    pub fix_column: String,

    #[arg(long, short, global = true, help = "No progress spinner, warnings only")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mine method histories into a CSV file
    Mine(MineArgs),
    /// List the methods in the files a commit changes
    Methods {
        #[arg(help = "Commit hash or reference")]
        hash: String,
    },
}

#[derive(Args, Clone)]
pub struct MineArgs {
    #[arg(long, short, help = "Output CSV path")]
    pub output: PathBuf,

    #[arg(long, help = "Read commits from an NDJSON stream instead of the repository")]
    pub commits: Option<PathBuf>,

    #[arg(long, help = "Only mine methods present in the files this commit changes")]
    pub only_commit: Option<String>,

    #[arg(long = "method", help = "Only mine this key (path$$method), repeatable")]
    pub methods: Vec<String>,

    #[arg(long = "file", help = "Only mine methods of this file, repeatable")]
    pub files: Vec<String>,

    #[arg(
        long,
        help = "Aggregate only records within this span of a method's oldest record (e.g. 4months)"
    )]
    pub window: Option<String>,

    #[arg(long, help = "Print the run summary as JSON")]
    pub json: bool,
}

/// Everything a mining run needs, validated up front.
#[derive(Debug, Clone)]
pub struct MineConfig {
    pub repo: PathBuf,
    pub extensions: ExtensionFilter,
    pub from: String,
    pub to: Option<String>,
    pub bic: Option<(PathBuf, String)>,
    pub fix: Option<(PathBuf, String)>,
    pub quiet: bool,
    pub output: PathBuf,
    pub commits: Option<PathBuf>,
    pub only_commit: Option<String>,
    pub methods: Vec<MethodKey>,
    pub files: Vec<String>,
    pub window: Option<chrono::Duration>,
    pub json: bool,
}

impl CommonArgs {
    pub fn repo_path(&self) -> PathBuf {
        self.repo.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn extension_filter(&self) -> ExtensionFilter {
        if self.extensions.is_empty() {
            ExtensionFilter::new([".cpp"])
        } else {
            ExtensionFilter::new(&self.extensions)
        }
    }
}

impl MineConfig {
    pub fn from_args(common: &CommonArgs, args: &MineArgs) -> Result<Self> {
        let methods = args
            .methods
            .iter()
            .map(|raw| {
                MethodKey::parse(raw)
                    .with_context(|| format!("Invalid method key '{raw}', expected path$$method"))
            })
            .collect::<Result<Vec<_>>>()?;

        let window = match args.window.as_deref() {
            Some(raw) => {
                let span = humantime::parse_duration(raw)
                    .with_context(|| format!("Invalid window '{raw}'"))?;
                Some(chrono::Duration::from_std(span).context("Window is too large")?)
            }
            None => None,
        };

        Ok(Self {
            repo: common.repo_path(),
            extensions: common.extension_filter(),
            from: common.from.clone().unwrap_or_else(|| "HEAD".to_string()),
            to: common.to.clone(),
            bic: common.bic.clone().map(|p| (p, common.bic_column.clone())),
            fix: common.fix.clone().map(|p| (p, common.fix_column.clone())),
            quiet: common.quiet,
            output: args.output.clone(),
            commits: args.commits.clone(),
            only_commit: args.only_commit.clone(),
            methods,
            files: args.files.clone(),
            window,
            json: args.json,
        })
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Mine(args) => {
                let config = MineConfig::from_args(&self.common, &args)?;
                crate::mine::exec(config)
            }
            Commands::Methods { hash } => crate::mine::exec::list_methods(&self.common, &hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn mine_args_normalize_into_config() {
        let cli = parse(&[
            "methodmine", "--ext", ".h", "--ext", "CPP", "mine", "-o", "out.csv",
            "--method", "a.cpp$$foo", "--window", "4months",
        ]);
        let Commands::Mine(args) = &cli.command else { panic!("expected mine") };
        let config = MineConfig::from_args(&cli.common, args).unwrap();

        assert_eq!(config.from, "HEAD");
        assert!(config.extensions.allows("x.cpp"));
        assert!(config.extensions.allows("x.h"));
        assert!(!config.extensions.allows("x.c"));
        assert_eq!(config.methods, vec![MethodKey::new("a.cpp", "foo")]);
        assert!(config.window.unwrap() > chrono::Duration::days(100));
        assert!(config.bic.is_none());
    }

    #[test]
    fn label_columns_default() {
        let cli = parse(&["methodmine", "--bic", "bic.csv", "mine", "-o", "out.csv"]);
        let Commands::Mine(args) = &cli.command else { panic!("expected mine") };
        let config = MineConfig::from_args(&cli.common, args).unwrap();
        assert_eq!(config.bic, Some((PathBuf::from("bic.csv"), "bic_commit".to_string())));
        assert!(config.extensions.allows("a.cpp"));
        assert!(!config.extensions.allows("a.h"));
    }

    #[test]
    fn bad_method_key_is_rejected() {
        let cli = parse(&["methodmine", "mine", "-o", "out.csv", "--method", "nokey"]);
        let Commands::Mine(args) = &cli.command else { panic!("expected mine") };
        assert!(MineConfig::from_args(&cli.common, args).is_err());
    }
}
