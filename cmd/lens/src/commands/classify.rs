//! `lens classify`: label image files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use anyhow::Context as _;
use clap::Args;
use lens_recognizer::runtime::Runtime;
use lens_recognizer::{Engine, EnginePool, PredictError};
use tracing::{debug, info};

use crate::config::{Config, Overrides, Settings};
use crate::output::{Classification, Output};
use crate::Cli;

/// Classify image files with the configured model.
#[derive(Args)]
pub struct ClassifyCommand {
    /// Image files to classify
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// ONNX model file
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Label file, one class name per line
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Model input height (<= 0 means 224)
    #[arg(long, allow_negative_numbers = true)]
    pub height: Option<i32>,

    /// Model input width (<= 0 means 224)
    #[arg(long, allow_negative_numbers = true)]
    pub width: Option<i32>,

    /// Number of engines classifying in parallel
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,
}

impl ClassifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = Config::load(cli.config.as_deref())?;
        let settings = cfg.resolve(&self.overrides())?;

        info!(
            model = %settings.model.display(),
            images = self.images.len(),
            workers = settings.workers,
            "classifying"
        );
        let results = classify(&settings, &self.images)?;

        Output::new(cli.format, cli.output.clone()).write(&results)?;

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if failed > 0 {
            anyhow::bail!("{failed} of {} images failed", results.len());
        }
        Ok(())
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            model: self.model.clone(),
            labels: self.labels.clone(),
            input_height: self.height,
            input_width: self.width,
            workers: self.workers,
        }
    }
}

#[cfg(feature = "onnx")]
fn classify(settings: &Settings, images: &[PathBuf]) -> anyhow::Result<Vec<Classification>> {
    classify_all::<lens_recognizer::runtime::OrtRuntime>(settings, images)
}

#[cfg(not(feature = "onnx"))]
fn classify(_settings: &Settings, _images: &[PathBuf]) -> anyhow::Result<Vec<Classification>> {
    anyhow::bail!("lens was built without ONNX Runtime support, rebuild with `--features onnx`")
}

/// Classifies `images` on a pool of `settings.workers` engines, keeping
/// input order in the result.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn classify_all<R>(settings: &Settings, images: &[PathBuf]) -> anyhow::Result<Vec<Classification>>
where
    R: Runtime + Default,
    Engine<R>: Send,
{
    let workers = settings.workers.min(images.len()).max(1);
    let pool = EnginePool::build(workers, || {
        Engine::<R>::new(
            &settings.model,
            &settings.labels,
            settings.input_height,
            settings.input_width,
        )
    })
    .with_context(|| format!("load model {}", settings.model.display()))?;

    let next = &AtomicUsize::new(0);
    let pool = &pool;
    let mut results: Vec<(usize, Classification)> = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                s.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some(path) = images.get(i) else { break };
                        let outcome = pool
                            .acquire()
                            .and_then(|mut engine| engine.predict_from_file(path));
                        debug!(image = %path.display(), ok = outcome.is_ok(), "classified");
                        done.push((i, entry(path, outcome)));
                    }
                    done
                })
            })
            .collect();

        let mut all = Vec::with_capacity(images.len());
        for handle in handles {
            match handle.join() {
                Ok(done) => all.extend(done),
                Err(_) => anyhow::bail!("classification worker panicked"),
            }
        }
        Ok(all)
    })?;

    pool.close();
    results.sort_by_key(|(i, _)| *i);
    Ok(results.into_iter().map(|(_, c)| c).collect())
}

fn entry(path: &Path, outcome: Result<String, PredictError>) -> Classification {
    match outcome {
        Ok(label) => Classification {
            image: path.to_path_buf(),
            label: Some(label),
            error: None,
        },
        Err(err) => Classification {
            image: path.to_path_buf(),
            label: None,
            error: Some(err.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_from_outcome() {
        let ok = entry(Path::new("cat.jpg"), Ok("tabby".into()));
        assert!(ok.is_ok());
        assert_eq!(ok.label.as_deref(), Some("tabby"));

        let failed = entry(Path::new("x.png"), Err(PredictError::EmptyOutput));
        assert!(!failed.is_ok());
        assert_eq!(failed.error.as_deref(), Some("empty output from model"));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn classify_without_backend() {
        let settings = Settings {
            model: "m.onnx".into(),
            labels: "l.txt".into(),
            input_height: 0,
            input_width: 0,
            workers: 1,
        };
        let err = classify(&settings, &[PathBuf::from("a.png")]).unwrap_err();
        assert!(err.to_string().contains("--features onnx"));
    }
}
