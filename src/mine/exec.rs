use super::{CsvSink, MineOptions, Miner, NoProgress, ProgressReporter, Scope, SpinnerProgress};
use crate::cli::{CommonArgs, MineConfig};
use crate::git::{CFamilyExtractor, GitRepo, GitSource};
use crate::labels::LabelSets;
use crate::model::MineSummary;
use crate::source::{CommitSource, JsonlSource};
use anyhow::Context;
use console::style;

pub fn exec(config: MineConfig) -> anyhow::Result<()> {
    let labels = LabelSets::load(
        config.bic.as_ref().map(|(p, c)| (p.as_path(), c.as_str())),
        config.fix.as_ref().map(|(p, c)| (p.as_path(), c.as_str())),
    )
    .context("Failed to load commit labels")?;

    // the repository is only needed when commits come from it or a commit scope is asked for
    let repo = if config.commits.is_none() || config.only_commit.is_some() {
        Some(GitRepo::open(&config.repo).context("Failed to open git repository")?)
    } else {
        None
    };

    let scope = build_scope(&config, repo.as_ref())?;
    let options = MineOptions {
        extensions: config.extensions.clone(),
        scope,
        window: config.window,
    };

    let mut source: Box<dyn CommitSource + '_> = match (&config.commits, &repo) {
        (Some(path), _) => Box::new(JsonlSource::new(path)),
        (None, Some(repo)) => Box::new(
            GitSource::new(
                repo,
                &config.from,
                config.to.as_deref(),
                config.extensions.clone(),
                Box::new(CFamilyExtractor),
            )
            .context("Failed to resolve commit range")?,
        ),
        (None, None) => anyhow::bail!("No commit source"),
    };

    let sink = CsvSink::create(&config.output).context("Failed to open output")?;
    let progress: Box<dyn ProgressReporter> = if config.quiet || config.json {
        Box::new(NoProgress)
    } else {
        Box::new(SpinnerProgress::new())
    };

    tracing::info!(
        output = %config.output.display(),
        from = %config.from,
        to = config.to.as_deref().unwrap_or("<root>"),
        "mining started"
    );
    let miner = Miner::new(options, &labels, sink).with_progress(progress);
    let (summary, _sink) = miner
        .run(source.commits().context("Failed to read commits")?)
        .context("Mining failed")?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, &config);
    }
    Ok(())
}

fn build_scope(config: &MineConfig, repo: Option<&GitRepo>) -> anyhow::Result<Option<Scope>> {
    let mut methods = config.methods.clone();
    if let (Some(hash), Some(repo)) = (&config.only_commit, repo) {
        let keys = repo
            .methods_in_commit(hash, &config.extensions, &CFamilyExtractor)
            .with_context(|| format!("Failed to list methods of commit {hash}"))?;
        tracing::info!(commit = %hash, methods = keys.len(), "scoped to commit");
        methods.extend(keys);
    }

    let mut scope = Scope::new();
    if !methods.is_empty() || config.only_commit.is_some() {
        scope = scope.with_methods(methods);
    }
    if !config.files.is_empty() {
        scope = scope.with_files(config.files.iter().cloned());
    }
    Ok((!scope.is_unrestricted()).then_some(scope))
}

fn print_summary(summary: &MineSummary, config: &MineConfig) {
    println!(
        "{} {} commits, {} rows -> {}",
        style("Mined").green().bold(),
        summary.commits,
        summary.flushed,
        style(config.output.display()).cyan()
    );
    println!(
        "  {} records, {} closed on file creation, {} open at peak",
        summary.records, summary.flushed_on_add, summary.open_peak
    );
    println!(
        "  {} renames ({} merged), {} skipped after closure, {} out of scope",
        summary.renames, summary.merges, summary.skipped_closed, summary.skipped_scope
    );
}

/// `methods <hash>`: print the keys of the methods in a commit's changed files.
pub fn list_methods(common: &CommonArgs, hash: &str) -> anyhow::Result<()> {
    let repo = GitRepo::open(&common.repo_path()).context("Failed to open git repository")?;
    let keys = repo
        .methods_in_commit(hash, &common.extension_filter(), &CFamilyExtractor)
        .with_context(|| format!("Failed to list methods of commit {hash}"))?;
    for key in keys {
        println!("{key}");
    }
    Ok(())
}
