use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;

use seqset::{AlphabetSpec, BatchOptions, Dataset, FeatureKind, Group, LoadOptions};

/// One class file of `count` distinct records: record `i` is all 'A' except
/// a single 'C' at position `i`, so batches reveal which record landed where.
fn write_marked_fasta(dir: &TempDir, count: usize) -> PathBuf {
    let path = dir.path().join("marked.fasta");
    let mut file = std::fs::File::create(&path).unwrap();
    for i in 0..count {
        let mut sequence = vec![b'A'; count];
        sequence[i] = b'C';
        writeln!(file, ">{i}").unwrap();
        writeln!(file, "{}", String::from_utf8(sequence).unwrap()).unwrap();
    }
    path
}

fn marked_dataset(dir: &TempDir, count: usize) -> Dataset {
    let path = write_marked_fasta(dir, count);
    let mut dataset = Dataset::from_class_files(
        &[path],
        &AlphabetSpec::Sequence("AC".to_string()),
        LoadOptions { seed: Some(3) },
    )
    .unwrap();
    dataset.train_val_test_split(1.0, 0.0, Some(3)).unwrap();
    dataset
}

/// Which record a batch slot holds, read back from the marker position.
fn slot_record(batch: &seqset::Batch, slot: usize) -> usize {
    let row_count = batch.inputs.shape()[1];
    (0..row_count)
        .find(|&position| batch.inputs[[slot, position, 1]] == 1.0)
        .expect("every record carries one marker")
}

#[test]
fn batches_walk_the_group_in_fixed_windows() {
    let dir = tempfile::tempdir().unwrap();
    let data = marked_dataset(&dir, 8);
    let options = BatchOptions::default().batch_size(3).shuffle(false);
    let batches: Vec<seqset::Batch> = data.batches(Group::Train, options).unwrap().take(5).collect();
    assert_eq!(
        batches.iter().map(|b| b.len()).collect::<Vec<_>>(),
        vec![3, 3, 2, 3, 3]
    );
    // Unshuffled, the stream walks records in group order and wraps around.
    let order: Vec<usize> = batches
        .iter()
        .flat_map(|batch| (0..batch.len()).map(|slot| slot_record(batch, slot)).collect::<Vec<_>>())
        .collect();
    assert_eq!(order[..8], *data.group_indices(Group::Train));
    assert_eq!(order[8..], order[..6]);
}

#[test]
fn labels_stay_aligned_with_their_records() {
    let dir = tempfile::tempdir().unwrap();
    let path_a = write_marked_fasta(&dir, 12);
    let path_b = dir.path().join("other.fasta");
    let mut file = std::fs::File::create(&path_b).unwrap();
    for i in 0..4 {
        writeln!(file, ">{i}").unwrap();
        writeln!(file, "{}", "C".repeat(12)).unwrap();
    }
    drop(file);
    let data = Dataset::from_class_files(
        &[path_a, path_b],
        &AlphabetSpec::Sequence("AC".to_string()),
        LoadOptions { seed: Some(5) },
    )
    .unwrap();

    let options = BatchOptions::default().batch_size(16).seed(11);
    let batch = data.batches(Group::All, options).unwrap().next().unwrap();
    let labels = batch.labels.as_ref().unwrap();
    for slot in 0..batch.len() {
        // Class-1 records are all 'C'; class-0 records carry exactly one.
        let is_class_1 =
            batch.inputs[[slot, 0, 1]] == 1.0 && batch.inputs[[slot, 1, 1]] == 1.0;
        assert_eq!(labels[[slot, 1]], u8::from(is_class_1));
        assert_eq!(labels[[slot, 0]], u8::from(!is_class_1));
    }
}

#[test]
fn seeded_streams_agree_and_repeat_across_passes() {
    let dir = tempfile::tempdir().unwrap();
    let data = marked_dataset(&dir, 32);
    let options = BatchOptions::default().batch_size(32).seed(21);
    let mut first = data.batches(Group::Train, options.clone()).unwrap();
    let mut second = data.batches(Group::Train, options).unwrap();

    let pass_one = first.next().unwrap();
    let pass_two = first.next().unwrap();
    let other_stream = second.next().unwrap();
    assert_eq!(pass_one.inputs, pass_two.inputs);
    assert_eq!(pass_one.inputs, other_stream.inputs);
}

#[test]
fn unseeded_shuffles_draw_fresh_permutations() {
    let dir = tempfile::tempdir().unwrap();
    let data = marked_dataset(&dir, 32);
    let options = BatchOptions::default().batch_size(32);
    let mut stream = data.batches(Group::Train, options).unwrap();
    let pass_one = stream.next().unwrap();
    let pass_two = stream.next().unwrap();
    assert_ne!(pass_one.inputs, pass_two.inputs);
}

#[test]
fn select_walks_chosen_positions_only() {
    let dir = tempfile::tempdir().unwrap();
    let data = marked_dataset(&dir, 8);
    let options = BatchOptions::default()
        .batch_size(8)
        .shuffle(false)
        .select(vec![1, 3, 5]);
    let batch = data.batches(Group::Train, options).unwrap().next().unwrap();
    assert_eq!(batch.len(), 3);
    let group = data.group_indices(Group::Train);
    let picked: Vec<usize> = (0..3).map(|slot| slot_record(&batch, slot)).collect();
    assert_eq!(picked, vec![group[1], group[3], group[5]]);
}

#[test]
fn aux_features_ride_along_with_their_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_marked_fasta(&dir, 10);
    let mut data = Dataset::from_class_files(
        &[path],
        &AlphabetSpec::Sequence("AC".to_string()),
        LoadOptions { seed: Some(7) },
    )
    .unwrap();
    let feature_path = dir.path().join("index.txt");
    let mut file = std::fs::File::create(&feature_path).unwrap();
    for i in 0..10 {
        writeln!(file, "{i}.0").unwrap();
    }
    drop(file);
    data.load_features(&[feature_path], FeatureKind::Numeric { standardize: false })
        .unwrap();

    let options = BatchOptions::default().batch_size(10).seed(13);
    let batch = data.batches(Group::All, options).unwrap().next().unwrap();
    let aux = batch.aux.as_ref().unwrap();
    assert_eq!(aux.dim(), (10, 1));
    for slot in 0..batch.len() {
        let record = slot_record(&batch, slot);
        assert_eq!(aux[[slot, 0]], record as f32);
    }

    // Opting out drops the aux block but keeps labels.
    let quiet = BatchOptions::default().batch_size(10).include_aux(false);
    let batch = data.batches(Group::All, quiet).unwrap().next().unwrap();
    assert!(batch.aux.is_none());
    assert!(batch.labels.is_some());

    // Opting out of labels keeps aux.
    let unlabeled = BatchOptions::default().batch_size(10).include_labels(false);
    let batch = data.batches(Group::All, unlabeled).unwrap().next().unwrap();
    assert!(batch.labels.is_none());
    assert!(batch.aux.is_some());
}
