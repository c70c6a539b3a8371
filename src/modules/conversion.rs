//! Background conversion: dispatch to a category converter, fall back to the
//! cross converter, and report exactly one terminal result.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::error::ConvertError;
use crate::modules::converters::{
    ConvertOptions, ConvertOutcome, Converter, CrossConverter, DocumentConverter, ImageConverter, PdfConverter,
    PresentationConverter, SpreadsheetConverter,
};
use crate::modules::format_detector::{Category, detect_format, get_file_category};

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    pub input_path: PathBuf,
    pub target_extension: String,
    /// Skips detection when the user picked the source format explicitly.
    pub source_override: Option<String>,
    pub options: ConvertOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub success: bool,
    pub message: String,
    pub output: Option<PathBuf>,
}

impl ConversionResult {
    fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), output: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionEvent {
    Progress(String),
    Finished(ConversionResult),
}

pub trait ConverterProvider {
    fn for_category(&self, category: Category, source: &str, options: &ConvertOptions) -> Option<Box<dyn Converter>>;
    fn cross(&self, source: &str, options: &ConvertOptions) -> Box<dyn Converter>;
}

pub struct BuiltinConverters;

impl ConverterProvider for BuiltinConverters {
    fn for_category(&self, category: Category, source: &str, options: &ConvertOptions) -> Option<Box<dyn Converter>> {
        let options = options.clone();
        Some(match category {
            Category::Document => Box::new(DocumentConverter::new(source, options)),
            Category::Spreadsheet => Box::new(SpreadsheetConverter::new(source, options)),
            Category::Presentation => Box::new(PresentationConverter::new(source, options)),
            Category::Pdf => Box::new(PdfConverter::new(options)),
            Category::Image => Box::new(ImageConverter::new(options)),
        })
    }

    fn cross(&self, source: &str, options: &ConvertOptions) -> Box<dyn Converter> {
        Box::new(CrossConverter::new(source, options.clone()))
    }
}

enum Attempt {
    Converted(PathBuf),
    Declined,
    Failed(ConvertError),
}

fn attempt(converter: &dyn Converter, input: &Path, target: &str) -> Attempt {
    match converter.convert(input, target) {
        Ok(ConvertOutcome::Converted(path)) => Attempt::Converted(path),
        Ok(ConvertOutcome::Declined) => {
            debug!(converter = converter.name(), "declined");
            Attempt::Declined
        }
        Err(e) => {
            warn!(converter = converter.name(), "conversion failed: {e}");
            Attempt::Failed(e)
        }
    }
}

/// Runs one job to completion on the calling thread. `progress` receives the
/// user-facing status lines.
pub fn run_conversion(
    job: &ConversionJob,
    provider: &dyn ConverterProvider,
    mut progress: impl FnMut(String),
) -> ConversionResult {
    progress("Starting conversion...".to_string());
    info!(input = %job.input_path.display(), to = %job.target_extension, "conversion started");

    let source = job
        .source_override
        .as_deref()
        .map(str::to_lowercase)
        .or_else(|| detect_format(&job.input_path));
    let Some(source) = source else {
        error!(input = %job.input_path.display(), "could not detect source format");
        return ConversionResult::failure("Could not detect source file format.");
    };
    let target = job.target_extension.to_lowercase();

    let mut last = Attempt::Declined;

    let specific = get_file_category(&source).and_then(|category| {
        debug!(source = %source, category = category.label(), "dispatching");
        provider.for_category(category, &source, &job.options)
    });

    if let Some(converter) = specific {
        progress(format!("Converting from .{source} to .{target}..."));
        last = attempt(converter.as_ref(), &job.input_path, &target);
        if matches!(last, Attempt::Declined) {
            progress("Attempting cross-category conversion...".to_string());
            last = attempt(provider.cross(&source, &job.options).as_ref(), &job.input_path, &target);
        }
    } else {
        debug!(source = %source, "no category converter");
    }

    // An error is terminal; only a decline reaches the fallback.
    if matches!(last, Attempt::Declined) {
        warn!(source = %source, to = %target, "falling back to cross-category conversion");
        progress("Attempting cross-category conversion (fallback)...".to_string());
        last = attempt(provider.cross(&source, &job.options).as_ref(), &job.input_path, &target);
    }

    match last {
        Attempt::Converted(path) => {
            info!(output = %path.display(), "conversion finished");
            ConversionResult {
                success: true,
                message: format!("Conversion successful! Output: {}", path.display()),
                output: Some(path),
            }
        }
        Attempt::Failed(e) => {
            error!("conversion failed: {e}");
            ConversionResult::failure(format!("An error occurred during conversion: {e}"))
        }
        Attempt::Declined => {
            error!(source = %source, to = %target, "conversion not supported");
            ConversionResult::failure("Conversion failed or is not supported.")
        }
    }
}

/// A job running on a worker thread. The UI polls it once per frame.
pub struct ConversionThread {
    receiver: Receiver<ConversionEvent>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl ConversionThread {
    pub fn spawn(job: ConversionJob, notify: impl Fn() + Send + 'static) -> Self {
        Self::spawn_with(job, BuiltinConverters, notify)
    }

    pub fn spawn_with<P>(job: ConversionJob, provider: P, notify: impl Fn() + Send + 'static) -> Self
    where
        P: ConverterProvider + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();

        let handle = thread::spawn(move || {
            let progress_sender = sender.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                run_conversion(&job, &provider, |message| {
                    let _ = progress_sender.send(ConversionEvent::Progress(message));
                    notify();
                })
            }));
            let result = outcome.unwrap_or_else(|_| {
                error!("converter panicked");
                ConversionResult::failure("An error occurred during conversion: converter panicked")
            });
            let _ = sender.send(ConversionEvent::Finished(result));
            notify();
        });

        Self { receiver, handle: Some(handle), finished: false }
    }

    /// Drains pending events. A worker that vanished without reporting yields
    /// a synthetic failure.
    pub fn poll(&mut self) -> Vec<ConversionEvent> {
        let mut events = Vec::new();
        while !self.finished {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.finished = matches!(event, ConversionEvent::Finished(_));
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    events.push(ConversionEvent::Finished(ConversionResult::failure(
                        "Conversion thread stopped unexpectedly.",
                    )));
                }
            }
        }
        if self.finished {
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
        events
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    #[derive(Clone, Copy)]
    enum Behavior {
        Convert,
        Decline,
        Fail,
        Panic,
    }

    struct Stub {
        name: &'static str,
        behavior: Behavior,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Converter for Stub {
        fn name(&self) -> &'static str {
            self.name
        }

        fn convert(&self, _input: &Path, target: &str) -> crate::error::Result<ConvertOutcome> {
            self.calls.lock().unwrap().push(self.name);
            match self.behavior {
                Behavior::Convert => Ok(ConvertOutcome::Converted(PathBuf::from(format!("/out/{}.{target}", self.name)))),
                Behavior::Decline => Ok(ConvertOutcome::Declined),
                Behavior::Fail => Err(ConvertError::InvalidInput(format!("{} broke", self.name))),
                Behavior::Panic => panic!("stub panic"),
            }
        }
    }

    struct StubProvider {
        specific: Option<Behavior>,
        cross: Behavior,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl StubProvider {
        fn new(specific: Option<Behavior>, cross: Behavior) -> Self {
            Self { specific, cross, calls: Arc::new(Mutex::new(Vec::new())) }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ConverterProvider for StubProvider {
        fn for_category(&self, _: Category, _: &str, _: &ConvertOptions) -> Option<Box<dyn Converter>> {
            self.specific.map(|behavior| {
                Box::new(Stub { name: "specific", behavior, calls: self.calls.clone() }) as Box<dyn Converter>
            })
        }

        fn cross(&self, _: &str, _: &ConvertOptions) -> Box<dyn Converter> {
            Box::new(Stub { name: "cross", behavior: self.cross, calls: self.calls.clone() })
        }
    }

    fn job(path: &str, target: &str) -> ConversionJob {
        ConversionJob {
            input_path: PathBuf::from(path),
            target_extension: target.to_string(),
            source_override: None,
            options: ConvertOptions::default(),
        }
    }

    fn run(provider: &StubProvider, job: &ConversionJob) -> (ConversionResult, Vec<String>) {
        let mut messages = Vec::new();
        let result = run_conversion(job, provider, |m| messages.push(m));
        (result, messages)
    }

    #[test]
    fn specific_converter_success_skips_cross() {
        let provider = StubProvider::new(Some(Behavior::Convert), Behavior::Convert);
        let (result, messages) = run(&provider, &job("/in/report.docx", "pdf"));

        assert!(result.success);
        assert_eq!(result.message, "Conversion successful! Output: /out/specific.pdf");
        assert_eq!(messages, vec!["Starting conversion...", "Converting from .docx to .pdf..."]);
        assert_eq!(provider.calls(), vec!["specific"]);
    }

    #[test]
    fn decline_goes_to_cross() {
        let provider = StubProvider::new(Some(Behavior::Decline), Behavior::Convert);
        let (result, messages) = run(&provider, &job("/in/sheet.csv", "png"));

        assert!(result.success);
        assert_eq!(result.output, Some(PathBuf::from("/out/cross.png")));
        assert_eq!(messages.last().unwrap(), "Attempting cross-category conversion...");
        assert_eq!(provider.calls(), vec!["specific", "cross"]);
    }

    #[test]
    fn declined_cross_gets_one_more_try() {
        let provider = StubProvider::new(Some(Behavior::Decline), Behavior::Decline);
        let (result, messages) = run(&provider, &job("/in/sheet.csv", "png"));

        assert!(!result.success);
        assert_eq!(result.message, "Conversion failed or is not supported.");
        assert_eq!(
            messages,
            vec![
                "Starting conversion...",
                "Converting from .csv to .png...",
                "Attempting cross-category conversion...",
                "Attempting cross-category conversion (fallback)...",
            ]
        );
        assert_eq!(provider.calls(), vec!["specific", "cross", "cross"]);
    }

    #[test]
    fn category_error_is_final() {
        let provider = StubProvider::new(Some(Behavior::Fail), Behavior::Convert);
        let (result, messages) = run(&provider, &job("/in/deck.pptx", "docx"));

        assert!(!result.success);
        assert_eq!(result.message, "An error occurred during conversion: invalid input: specific broke");
        assert!(!messages.iter().any(|m| m.contains("cross-category")));
        assert_eq!(provider.calls(), vec!["specific"]);
    }

    #[test]
    fn cross_error_is_final() {
        let provider = StubProvider::new(Some(Behavior::Decline), Behavior::Fail);
        let (result, _) = run(&provider, &job("/in/deck.pptx", "docx"));

        assert!(!result.success);
        assert_eq!(result.message, "An error occurred during conversion: invalid input: cross broke");
        assert_eq!(provider.calls(), vec!["specific", "cross"]);
    }

    #[test]
    fn missing_category_converter_uses_fallback() {
        let provider = StubProvider::new(None, Behavior::Convert);
        let (result, messages) = run(&provider, &job("/in/photo.png", "pdf"));

        assert!(result.success);
        assert_eq!(
            messages,
            vec!["Starting conversion...", "Attempting cross-category conversion (fallback)..."]
        );
    }

    #[test]
    fn undetectable_source_stops_early() {
        let provider = StubProvider::new(Some(Behavior::Convert), Behavior::Convert);
        let (result, _) = run(&provider, &job("/nonexistent/mystery", "pdf"));

        assert!(!result.success);
        assert_eq!(result.message, "Could not detect source file format.");
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn source_override_replaces_detection() {
        let provider = StubProvider::new(Some(Behavior::Convert), Behavior::Convert);
        let mut job = job("/nonexistent/mystery", "json");
        job.source_override = Some("CSV".to_string());
        let (result, messages) = run(&provider, &job);

        assert!(result.success);
        assert_eq!(messages[1], "Converting from .csv to .json...");
    }

    fn run_builtin(job: &ConversionJob) -> (ConversionResult, Vec<String>) {
        let mut messages = Vec::new();
        let result = run_conversion(job, &BuiltinConverters, |m| messages.push(m));
        (result, messages)
    }

    fn file_job(input: &Path, target: &str) -> ConversionJob {
        ConversionJob {
            input_path: input.to_path_buf(),
            target_extension: target.to_string(),
            source_override: None,
            options: ConvertOptions::default(),
        }
    }

    #[test]
    fn markdown_goes_through_the_document_converter() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.md");
        std::fs::write(&input, "# Notes\n\nFirst point.\n").unwrap();

        let (result, messages) = run_builtin(&file_job(&input, "html"));

        assert!(result.success, "{}", result.message);
        assert_eq!(messages, vec!["Starting conversion...", "Converting from .md to .html..."]);
        let html = std::fs::read_to_string(result.output.unwrap()).unwrap();
        assert!(html.contains("First point."));
    }

    #[test]
    fn tsv_goes_through_the_spreadsheet_converter() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scores.tsv");
        std::fs::write(&input, "name\tscore\nAnn\t9\n").unwrap();

        let (result, messages) = run_builtin(&file_job(&input, "json"));

        assert!(result.success, "{}", result.message);
        assert_eq!(messages.len(), 2);
        let json = std::fs::read_to_string(result.output.unwrap()).unwrap();
        assert!(json.contains("\"score\"") && json.contains("Ann"));
    }

    #[test]
    fn csv_to_png_is_declined_then_rendered_by_cross() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("table.csv");
        std::fs::write(&input, "a,b\n1,2\n").unwrap();

        let (result, messages) = run_builtin(&file_job(&input, "png"));

        assert!(result.success, "{}", result.message);
        assert_eq!(messages.last().unwrap(), "Attempting cross-category conversion...");
        let output = result.output.unwrap();
        assert_eq!(output, dir.path().join("table.png"));
        assert!(image::open(&output).is_ok());
    }

    fn wait(worker: &mut ConversionThread) -> Vec<ConversionEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();
        while !worker.is_finished() {
            assert!(Instant::now() < deadline, "conversion thread never finished");
            events.extend(worker.poll());
            thread::sleep(Duration::from_millis(5));
        }
        events
    }

    #[test]
    fn thread_reports_progress_then_one_result() {
        let notified = Arc::new(Mutex::new(0usize));
        let counter = notified.clone();
        let provider = StubProvider::new(Some(Behavior::Convert), Behavior::Convert);
        let mut worker = ConversionThread::spawn_with(job("/in/a.txt", "md"), provider, move || {
            *counter.lock().unwrap() += 1;
        });

        let events = wait(&mut worker);
        let finished: Vec<_> = events.iter().filter(|e| matches!(e, ConversionEvent::Finished(_))).collect();
        assert_eq!(finished.len(), 1);
        assert!(matches!(events.last(), Some(ConversionEvent::Finished(r)) if r.success));
        assert_eq!(events.first(), Some(&ConversionEvent::Progress("Starting conversion...".to_string())));
        assert_eq!(*notified.lock().unwrap(), events.len());
        assert!(worker.poll().is_empty());
    }

    #[test]
    fn panicking_converter_still_finishes() {
        let provider = StubProvider::new(Some(Behavior::Panic), Behavior::Convert);
        let mut worker = ConversionThread::spawn_with(job("/in/a.txt", "md"), provider, || {});

        let events = wait(&mut worker);
        match events.last() {
            Some(ConversionEvent::Finished(result)) => {
                assert!(!result.success);
                assert!(result.message.starts_with("An error occurred during conversion"));
            }
            other => panic!("unexpected final event: {other:?}"),
        }
    }
}
