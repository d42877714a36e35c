mod common;

use common::{write_bytes, Recorder};

use mc_core::{
	hash_files, hasher::NonCriticalHasherError, CancellationToken, HashMode, HashOptions,
};

use tempfile::TempDir;

#[tokio::test]
async fn batch_fingerprints_are_deterministic() -> Result<(), Box<dyn std::error::Error>> {
	let dir = TempDir::new()?;
	let paths = (0..8)
		.map(|i| {
			let path = dir.path().join(format!("{i}.bin"));
			write_bytes(&path, format!("content {}", i % 4).as_bytes());
			path
		})
		.collect::<Vec<_>>();

	let options = HashOptions {
		mode: HashMode::Full,
		concurrency: 3,
	};
	let first = hash_files(&paths, options, &Recorder::default(), &CancellationToken::new()).await;
	let second = hash_files(&paths, options, &Recorder::default(), &CancellationToken::new()).await;

	assert_eq!(first.len(), 8);
	for path in &paths {
		assert_eq!(first[path].as_ref().ok(), second[path].as_ref().ok());
	}

	// Same content, same fingerprint
	assert_eq!(first[&paths[0]], first[&paths[4]]);
	assert_ne!(first[&paths[0]], first[&paths[1]]);

	Ok(())
}

#[tokio::test]
async fn deleted_files_are_absent_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
	let dir = TempDir::new()?;
	let kept = dir.path().join("kept.bin");
	let deleted = dir.path().join("deleted.bin");
	write_bytes(&kept, b"kept");
	write_bytes(&deleted, b"deleted");
	std::fs::remove_file(&deleted)?;

	let recorder = Recorder::default();
	let results = hash_files(
		&[deleted.clone(), kept.clone()],
		HashOptions::default(),
		&recorder,
		&CancellationToken::new(),
	)
	.await;

	assert!(matches!(results[&deleted], Err(NonCriticalHasherError::Io(_))));
	assert!(results[&kept].is_ok());

	let mut items = recorder.items();
	items.sort_unstable();
	assert_eq!(items, vec![(1, 2), (2, 2)]);

	Ok(())
}

#[tokio::test]
async fn partial_batches_are_tagged() -> Result<(), Box<dyn std::error::Error>> {
	let dir = TempDir::new()?;
	let path = dir.path().join("movie.mkv");
	write_bytes(&path, &[3; 4096]);

	let results = hash_files(
		std::slice::from_ref(&path),
		HashOptions {
			mode: HashMode::Partial,
			concurrency: 1,
		},
		&Recorder::default(),
		&CancellationToken::new(),
	)
	.await;

	let fingerprint = results[&path].clone()?;
	assert!(fingerprint.to_string().starts_with("blake3-partial:"));

	Ok(())
}
