//! Scanner integration tests
//!
//! Scans real temporary trees into a `MemoryCatalog` and checks what got registered and which
//! progress was reported along the way.

mod common;

use common::{write_bytes, write_png, Recorder};

use mc_core::{
	hasher::HashMode, scanner::NonCriticalScannerError, CancellationToken, MemoryCatalog,
	PipelineConfig, ProgressReporter, ProgressUpdate, ScanPhase, ScanStatus, Scanner,
	ScannerError,
};
use mc_file_ext::MediaKind;

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use tempfile::TempDir;
use tracing_test::traced_test;
use uuid::Uuid;

fn scanner(catalog: &Arc<MemoryCatalog>, config: &PipelineConfig) -> (Uuid, Scanner) {
	let profile_id = Uuid::new_v4();
	let scanner = Scanner::new(profile_id, catalog.clone(), config).unwrap();
	(profile_id, scanner)
}

#[tokio::test]
#[traced_test]
async fn empty_tree_completes_with_zero_counts() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &PipelineConfig::default());
	let recorder = Recorder::default();

	let report = scanner
		.scan(root.path(), &recorder, &CancellationToken::new())
		.await?;

	assert_eq!(report.status, ScanStatus::Completed);
	assert_eq!(report.stats.processed, 0);
	assert!(catalog.is_empty().await);

	let complete = recorder.phase(ScanPhase::Complete);
	assert_eq!(complete.len(), 1);
	assert_eq!((complete[0].current, complete[0].total), (0, 0));

	let counting = recorder.phase(ScanPhase::Counting);
	assert_eq!(counting.len(), 1);
	assert_eq!((counting[0].current, counting[0].total), (0, 0));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn registers_media_and_reports_phases_in_order() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	write_png(root.path().join("a.png"), 4, 4);
	write_png(root.path().join("nested/deeper/b.png"), 4, 4);
	write_bytes(root.path().join("nested/clip.mp4"), b"not decoded during scans");
	write_bytes(root.path().join("notes.txt"), b"not media");
	write_png(root.path().join(".hidden.png"), 4, 4);
	write_png(root.path().join("cache/c.png"), 4, 4);

	let mut config = PipelineConfig::default();
	config.scanner.ignore_patterns = vec!["**/cache".to_string()];

	let catalog = Arc::new(MemoryCatalog::new());
	let (profile_id, scanner) = scanner(&catalog, &config);
	let recorder = Recorder::default();

	let report = scanner
		.scan(root.path(), &recorder, &CancellationToken::new())
		.await?;

	assert_eq!(report.status, ScanStatus::Completed);
	assert_eq!(report.stats.counted, 4);
	assert_eq!(report.stats.processed, 4);
	assert_eq!(report.stats.registered, 3);
	assert!(report.errors.is_empty(), "{:?}", report.errors);

	let records = catalog.snapshot().await;
	assert_eq!(records.len(), 3);
	assert!(records.iter().all(|record| record.profile_id == profile_id));
	assert!(records
		.iter()
		.all(|record| record.fingerprint.as_ref().map(|f| f.mode) == Some(HashMode::Full)));

	let video = catalog
		.find_by_path(profile_id, root.path().join("nested/clip.mp4"))
		.await
		.unwrap();
	assert_eq!(video.kind, MediaKind::Video);
	assert!(catalog
		.find_by_path(profile_id, root.path().join(".hidden.png"))
		.await
		.is_none());

	// counting → scanning → complete, current never going back within a phase
	let phases = recorder
		.scan_updates()
		.into_iter()
		.map(|progress| progress.phase)
		.collect::<Vec<_>>();
	assert_eq!(phases.first(), Some(&ScanPhase::Counting));
	assert_eq!(phases.last(), Some(&ScanPhase::Complete));
	let first_scanning = phases.iter().position(|p| *p == ScanPhase::Scanning).unwrap();
	assert!(phases[..first_scanning].iter().all(|p| *p == ScanPhase::Counting));

	let scanning = recorder.phase(ScanPhase::Scanning);
	assert_eq!(scanning.len(), 4);
	assert!(scanning.windows(2).all(|w| w[0].current < w[1].current));
	assert!(scanning.iter().all(|p| p.total == 4 && p.current_file.is_some()));

	Ok(())
}

#[tokio::test]
async fn rescanning_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	write_png(root.path().join("a.png"), 4, 4);
	write_png(root.path().join("b.png"), 4, 4);

	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &PipelineConfig::default());

	for _ in 0..2 {
		scanner
			.scan(root.path(), &Recorder::default(), &CancellationToken::new())
			.await?;
	}

	assert_eq!(catalog.len().await, 2);

	Ok(())
}

#[tokio::test]
async fn missing_root_reaches_the_error_phase() {
	let root = TempDir::new().unwrap();
	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &PipelineConfig::default());
	let recorder = Recorder::default();

	let res = scanner
		.scan(root.path().join("nope"), &recorder, &CancellationToken::new())
		.await;

	assert!(matches!(res, Err(ScannerError::RootNotFound(_))));

	let updates = recorder.scan_updates();
	assert_eq!(updates.len(), 1);
	assert_eq!(updates[0].phase, ScanPhase::Error);
	assert!(updates[0].message.is_some());
}

#[tokio::test]
async fn file_root_is_rejected() {
	let root = TempDir::new().unwrap();
	let file = root.path().join("a.png");
	write_png(&file, 2, 2);

	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &PipelineConfig::default());

	assert!(matches!(
		scanner
			.scan(&file, &Recorder::default(), &CancellationToken::new())
			.await,
		Err(ScannerError::RootNotADirectory(_))
	));
}

#[tokio::test]
#[traced_test]
async fn cancellation_stops_at_an_entry_boundary() -> Result<(), Box<dyn std::error::Error>> {
	const STOP_AFTER: u64 = 3;

	let root = TempDir::new()?;
	for i in 0..10 {
		write_bytes(root.path().join(format!("{i}.jpg")), format!("image {i}").as_bytes());
	}

	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &PipelineConfig::default());

	let cancel = CancellationToken::new();
	let reporter = {
		let cancel = cancel.clone();
		move |update: ProgressUpdate| {
			if let ProgressUpdate::Scan(progress) = update {
				if progress.phase == ScanPhase::Scanning && progress.current == STOP_AFTER {
					cancel.cancel();
				}
			}
		}
	};

	let report = scanner.scan(root.path(), &reporter, &cancel).await?;

	assert_eq!(report.status, ScanStatus::Canceled);
	assert_eq!(report.stats.processed, STOP_AFTER);
	assert_eq!(catalog.len().await, 3);

	Ok(())
}

#[tokio::test]
async fn canceled_before_start_registers_nothing() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	write_png(root.path().join("a.png"), 2, 2);

	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &PipelineConfig::default());
	let cancel = CancellationToken::new();
	cancel.cancel();
	let recorder = Recorder::default();

	let report = scanner.scan(root.path(), &recorder, &cancel).await?;

	assert_eq!(report.status, ScanStatus::Canceled);
	assert!(catalog.is_empty().await);
	assert_eq!(
		recorder.phase(ScanPhase::Complete)[0].message.as_deref(),
		Some("scan canceled")
	);

	Ok(())
}

#[tokio::test]
async fn large_files_get_partial_fingerprints() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	write_bytes(root.path().join("small.mp4"), &[1; 16]);
	write_bytes(root.path().join("large.mp4"), &[1; 64]);

	let mut config = PipelineConfig::default();
	config.hashing.partial_threshold = 32;

	let catalog = Arc::new(MemoryCatalog::new());
	let (profile_id, scanner) = scanner(&catalog, &config);
	scanner
		.scan(root.path(), &Recorder::default(), &CancellationToken::new())
		.await?;

	let mode_of = |name: &'static str| {
		let catalog = catalog.clone();
		let path = root.path().join(name);
		async move {
			catalog
				.find_by_path(profile_id, path)
				.await
				.and_then(|record| record.fingerprint)
				.map(|fingerprint| fingerprint.mode)
		}
	};

	assert_eq!(mode_of("small.mp4").await, Some(HashMode::Full));
	assert_eq!(mode_of("large.mp4").await, Some(HashMode::Partial));

	Ok(())
}

#[tokio::test]
async fn unknown_kinds_can_be_accepted() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	write_bytes(root.path().join("notes.txt"), b"words");
	write_bytes(root.path().join("song.mp3"), b"ID3\x04");

	let mut config = PipelineConfig::default();
	config.scanner.accepted_kinds = vec![MediaKind::Unknown];
	config.scanner.fingerprint = false;

	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &config);
	let report = scanner
		.scan(root.path(), &Recorder::default(), &CancellationToken::new())
		.await?;

	let records = catalog.snapshot().await;
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].kind, MediaKind::Unknown);
	assert!(records[0].fingerprint.is_none());
	assert_eq!(report.stats.ignored, 1);

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn scans_can_generate_previews_once() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	let data_dir = TempDir::new()?;
	write_png(root.path().join("photo.png"), 64, 32);

	let mut config = PipelineConfig::default().with_data_dir(data_dir.path());
	config.scanner.generate_previews = true;

	let catalog = Arc::new(MemoryCatalog::new());
	let (profile_id, scanner) = scanner(&catalog, &config);

	let report = scanner
		.scan(root.path(), &Recorder::default(), &CancellationToken::new())
		.await?;
	assert_eq!(report.stats.thumbnails, 1);

	let record = catalog
		.find_by_path(profile_id, root.path().join("photo.png"))
		.await
		.unwrap();
	let thumbnail = std::path::PathBuf::from(record.thumbnail.unwrap());
	assert!(thumbnail.exists());
	assert!(thumbnail.starts_with(
		data_dir
			.path()
			.join("thumbnails")
			.join(profile_id.to_string())
	));

	// Unchanged content keeps its thumbnail
	let report = scanner
		.scan(root.path(), &Recorder::default(), &CancellationToken::new())
		.await?;
	assert_eq!(report.stats.thumbnails, 0);

	Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_loops_are_walked_once() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	write_png(root.path().join("album/a.png"), 2, 2);
	std::os::unix::fs::symlink(root.path(), root.path().join("album/loop"))?;

	let mut config = PipelineConfig::default();
	config.scanner.follow_symlinks = true;

	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &config);
	let report = scanner
		.scan(root.path(), &Recorder::default(), &CancellationToken::new())
		.await?;

	assert_eq!(report.status, ScanStatus::Completed);
	assert_eq!(catalog.len().await, 1);
	assert!(report
		.errors
		.iter()
		.any(|e| matches!(e, NonCriticalScannerError::SymlinkCycle(_))));

	Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_directories_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
	use std::os::unix::fs::PermissionsExt;

	let root = TempDir::new()?;
	write_png(root.path().join("open/a.png"), 2, 2);
	write_png(root.path().join("locked/b.png"), 2, 2);
	let locked = root.path().join("locked");
	std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000))?;

	// root ignores permission bits
	if std::fs::read_dir(&locked).is_ok() {
		std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))?;
		return Ok(());
	}

	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &PipelineConfig::default());
	let report = scanner
		.scan(root.path(), &Recorder::default(), &CancellationToken::new())
		.await;

	std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))?;
	let report = report?;

	assert_eq!(report.status, ScanStatus::Completed);
	assert_eq!(catalog.len().await, 1);
	assert!(report
		.errors
		.iter()
		.any(|e| matches!(e, NonCriticalScannerError::ReadDir { .. })));

	Ok(())
}

#[tokio::test]
async fn channel_reporter_sees_the_whole_scan() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	write_png(root.path().join("a.png"), 2, 2);

	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &PipelineConfig::default());
	let (reporter, mut rx) = mc_core::ChannelReporter::new(64);

	scanner
		.scan(root.path(), &reporter as &dyn ProgressReporter, &CancellationToken::new())
		.await?;
	drop(reporter);

	let mut last = None;
	while let Some(update) = rx.recv().await {
		last = Some(update);
	}

	assert!(matches!(
		last,
		Some(ProgressUpdate::Scan(progress)) if progress.phase == ScanPhase::Complete
	));

	Ok(())
}

fn assert_totals_never_rise(updates: &[mc_core::ScanProgress], counted: u64) {
	let after_counting = updates
		.iter()
		.filter(|p| p.phase != ScanPhase::Counting)
		.collect::<Vec<_>>();
	assert!(after_counting.iter().all(|p| p.total <= counted && p.current <= p.total));
	assert!(after_counting.windows(2).all(|w| w[0].total >= w[1].total));
	assert!(after_counting.windows(2).all(|w| w[0].current <= w[1].current));
}

#[tokio::test]
#[traced_test]
async fn files_created_mid_scan_never_raise_the_total() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	write_png(root.path().join("a.png"), 4, 4);
	write_png(root.path().join("sub/b.png"), 4, 4);

	let catalog = Arc::new(MemoryCatalog::new());
	let (profile_id, scanner) = scanner(&catalog, &PipelineConfig::default());
	let recorder = Recorder::default();
	let created = AtomicBool::new(false);
	let late = root.path().join("sub/late.png");

	// `sub` is only listed after the root directory, so the new file is picked up
	let reporter = |update: ProgressUpdate| {
		if let ProgressUpdate::Scan(progress) = &update {
			if progress.phase == ScanPhase::Scanning && !created.swap(true, Ordering::SeqCst) {
				write_png(&late, 4, 4);
			}
		}
		recorder.progress(update);
	};

	let report = scanner
		.scan(root.path(), &reporter, &CancellationToken::new())
		.await?;

	assert_eq!(report.status, ScanStatus::Completed);
	assert_eq!(report.stats.counted, 2);
	assert_eq!(report.stats.processed, 3);
	assert!(catalog.find_by_path(profile_id, &late).await.is_some());

	let scanning = recorder.phase(ScanPhase::Scanning);
	assert_eq!(scanning.len(), 3);
	assert_eq!(
		scanning
			.iter()
			.map(|p| (p.current, p.total))
			.collect::<Vec<_>>(),
		vec![(1, 2), (2, 2), (2, 2)]
	);
	assert_totals_never_rise(&recorder.scan_updates(), 2);

	let complete = recorder.phase(ScanPhase::Complete);
	assert_eq!((complete[0].current, complete[0].total), (2, 2));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn files_removed_mid_scan_lower_the_total() -> Result<(), Box<dyn std::error::Error>> {
	let root = TempDir::new()?;
	for name in ["a", "b", "c", "d", "e", "f"] {
		write_png(root.path().join(format!("{name}.png")), 4, 4);
	}

	let catalog = Arc::new(MemoryCatalog::new());
	let (_, scanner) = scanner(&catalog, &PipelineConfig::default());
	let recorder = Recorder::default();
	let removed = AtomicBool::new(false);

	// The root listing is already read ahead, every other entry is gone when it gets processed
	let reporter = |update: ProgressUpdate| {
		if let ProgressUpdate::Scan(progress) = &update {
			if progress.phase == ScanPhase::Scanning && !removed.swap(true, Ordering::SeqCst) {
				for entry in std::fs::read_dir(root.path()).unwrap() {
					let path = entry.unwrap().path();
					if Some(&path) != progress.current_file.as_ref() {
						std::fs::remove_file(path).unwrap();
					}
				}
			}
		}
		recorder.progress(update);
	};

	let report = scanner
		.scan(root.path(), &reporter, &CancellationToken::new())
		.await?;

	assert_eq!(report.status, ScanStatus::Completed);
	assert_eq!(report.stats.counted, 6);
	assert_eq!(report.stats.processed, 1);
	assert_eq!(report.stats.vanished, 5);
	assert_eq!(catalog.len().await, 1);
	assert!(report.errors.is_empty(), "{:?}", report.errors);

	assert_totals_never_rise(&recorder.scan_updates(), 6);

	let complete = recorder.phase(ScanPhase::Complete);
	assert_eq!((complete[0].current, complete[0].total), (1, 1));

	Ok(())
}
