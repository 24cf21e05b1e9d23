// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use stratum_core::vfs::{
    Blob, FileDesc, FileState, FileSystem, IoError, Marker, TranslateResult,
};
use stratum_io::{
    FilenameRules, LookupResult, MemoryFileSystem, MountId, MountingTree, MEMOIZED_SEGMENTS,
};

fn memory(files: &[(&str, &str)]) -> Arc<dyn FileSystem> {
    let fs = MemoryFileSystem::new();
    for (path, contents) in files {
        fs.insert(path, contents.as_bytes().to_vec());
    }
    Arc::new(fs)
}

/// Collects candidate mount ids until the cursor is exhausted.
fn candidates(tree: &MountingTree, request: &str) -> Vec<Option<MountId>> {
    let mut cursor = tree.lookup(request);
    let mut found = Vec::new();
    loop {
        match cursor.try_get_next() {
            LookupResult::Success(candidate) => found.push(candidate.mount_id),
            LookupResult::NoCandidates => return found,
            LookupResult::Invalidated => panic!("unexpected invalidation"),
        }
    }
}

/// A filesystem that only accepts paths with a given extension, like an
/// archive that knows its own table of contents.
struct ExtensionFs {
    extension: &'static str,
}

impl FileSystem for ExtensionFs {
    fn try_translate(&self, path: &str) -> TranslateResult {
        if path.ends_with(self.extension) {
            TranslateResult::Success(path.as_bytes().to_vec())
        } else {
            TranslateResult::Invalid
        }
    }

    fn try_load(&self, _marker: &Marker) -> Result<Blob, IoError> {
        Err(IoError::FileNotFound)
    }

    fn try_get_desc(&self, _marker: &Marker) -> FileDesc {
        FileDesc::missing()
    }
}

#[test]
fn unmounted_filesystem_produces_no_candidates() {
    let tree = MountingTree::default();
    let id = tree.mount("data", memory(&[]));
    assert_eq!(candidates(&tree, "data/x.txt"), vec![Some(id)]);

    tree.unmount(id);
    assert!(candidates(&tree, "data/x.txt").is_empty());
    assert!(tree.mounted_file_system(id).is_none());
    assert_eq!(tree.mount_point(id), "");
}

#[test]
fn registration_order_breaks_ties() {
    let tree = MountingTree::default();
    let a = tree.mount("data", memory(&[("x", "from a")]));
    let b = tree.mount("data", memory(&[("x", "from b")]));

    for _ in 0..10 {
        assert_eq!(candidates(&tree, "data/x"), vec![Some(a), Some(b)]);
    }
    assert_eq!(tree.try_load_file("data/x").unwrap().as_slice(), b"from a");
}

#[test]
fn loose_files_override_archives_only_where_they_exist() {
    let tree = MountingTree::default();
    tree.mount("game", memory(&[("textures/override.dds", "loose")]));
    tree.mount(
        "game",
        memory(&[
            ("textures/override.dds", "packed"),
            ("textures/only_packed.dds", "packed"),
        ]),
    );

    assert_eq!(
        tree.try_load_file("game/textures/override.dds").unwrap().as_slice(),
        b"loose"
    );
    assert_eq!(
        tree.try_load_file("game/textures/only_packed.dds").unwrap().as_slice(),
        b"packed"
    );
    assert_eq!(
        tree.try_load_file("game/textures/missing.dds"),
        Err(IoError::FileNotFound)
    );
}

#[test]
fn cursor_reports_invalidation_after_a_mount_change() {
    let tree = MountingTree::default();
    tree.mount("data", memory(&[]));
    tree.mount("data", memory(&[]));

    let request = String::from("data/file.bin");
    let mut cursor = tree.lookup(&request);
    assert!(matches!(cursor.try_get_next(), LookupResult::Success(_)));

    tree.mount("other", memory(&[]));

    assert!(matches!(cursor.try_get_next(), LookupResult::Invalidated));
    // Terminal: stays invalidated.
    assert!(matches!(cursor.try_get_next(), LookupResult::Invalidated));
}

/// Mounts onto its own tree the first time it is asked to translate a path.
struct MountingFs {
    tree: std::sync::OnceLock<std::sync::Weak<MountingTree>>,
    mounted: AtomicBool,
}

impl FileSystem for MountingFs {
    fn try_translate(&self, path: &str) -> TranslateResult {
        if !self.mounted.swap(true, Ordering::SeqCst) {
            if let Some(tree) = self.tree.get().and_then(|weak| weak.upgrade()) {
                tree.mount("side", memory(&[]));
            }
        }
        TranslateResult::Success(path.as_bytes().to_vec())
    }

    fn try_load(&self, _marker: &Marker) -> Result<Blob, IoError> {
        Err(IoError::FileNotFound)
    }

    fn try_get_desc(&self, _marker: &Marker) -> FileDesc {
        FileDesc::missing()
    }
}

#[test]
fn advancing_a_cursor_holds_no_lock() {
    let tree = Arc::new(MountingTree::default());
    let fs = Arc::new(MountingFs {
        tree: std::sync::OnceLock::new(),
        mounted: AtomicBool::new(false),
    });
    let _ = fs.tree.set(Arc::downgrade(&tree));
    tree.mount("data", fs.clone());

    // The filesystem mounts while the cursor is advancing through it.
    let mut cursor = tree.lookup("data/file.bin");
    assert!(matches!(cursor.try_get_next(), LookupResult::Success(_)));
    assert!(matches!(cursor.try_get_next(), LookupResult::Invalidated));
    assert_eq!(tree.mount_count(), 2);
}

#[test]
fn archive_loose_and_default_scenario() {
    let tree = MountingTree::default();
    let pak: Arc<dyn FileSystem> = Arc::new(ExtensionFs { extension: ".dds" });
    let os = memory(&[]);

    let archive = tree.mount("archive", pak);
    let loose = tree.mount("loose", os.clone());
    tree.set_default_file_system(Some(os));
    assert_eq!((archive.value(), loose.value()), (1, 2));

    assert_eq!(candidates(&tree, "archive/texture.dds"), vec![Some(archive)]);
    assert_eq!(candidates(&tree, "loose/model.dae"), vec![Some(loose)]);
    assert_eq!(candidates(&tree, "unknown/thing"), vec![None]);
}

#[test]
fn root_mounts_see_every_request() {
    let tree = MountingTree::default();
    let root = tree.mount("", memory(&[]));
    let data = tree.mount("data", memory(&[]));
    assert_eq!(candidates(&tree, "data/a.txt"), vec![Some(root), Some(data)]);
    assert_eq!(candidates(&tree, "elsewhere/a.txt"), vec![Some(root)]);
}

#[test]
fn a_mount_point_alone_is_not_a_file() {
    let tree = MountingTree::default();
    tree.mount("data/textures", memory(&[]));
    assert!(candidates(&tree, "data/textures").is_empty());
    assert!(candidates(&tree, "data").is_empty());
    assert_eq!(candidates(&tree, "data/textures/a.dds").len(), 1);
}

#[test]
fn fully_qualified_requests_skip_the_scan() {
    let tree = MountingTree::default();
    let first = tree.mount("data", memory(&[("x.txt", "first")]));
    let second = tree.mount("data", memory(&[("x.txt", "second")]));

    let request = format!("{}:/x.txt", second.value());
    assert_eq!(candidates(&tree, &request), vec![Some(second)]);
    assert_eq!(tree.try_load_file(&request).unwrap().as_slice(), b"second");

    assert!(candidates(&tree, "99:/x.txt").is_empty());
    assert_eq!(candidates(&tree, "data/x.txt"), vec![Some(first), Some(second)]);
}

#[test]
fn absolute_paths_go_to_the_default_filesystem() {
    let tree = MountingTree::default();
    tree.mount("", memory(&[]));
    assert!(candidates(&tree, "/etc/config").is_empty());

    tree.set_default_file_system(Some(memory(&[("etc/config", "cfg")])));
    assert_eq!(candidates(&tree, "/etc/config"), vec![None]);
    assert_eq!(tree.try_load_file("/etc/config").unwrap().as_slice(), b"cfg");
}

#[test]
fn dot_segments_are_resolved_before_matching() {
    let tree = MountingTree::default();
    let id = tree.mount("data", memory(&[("models/ship.dae", "ship")]));
    assert_eq!(candidates(&tree, "./data/textures/../models/ship.dae"), vec![Some(id)]);
    assert_eq!(
        tree.try_load_file("data/./models/ship.dae").unwrap().as_slice(),
        b"ship"
    );
}

#[test]
fn case_insensitive_rules_fold_mount_prefixes() {
    let tree = MountingTree::new(FilenameRules {
        case_sensitive: false,
        ..FilenameRules::default()
    });
    let id = tree.mount("Game/Data", memory(&[]));
    assert_eq!(candidates(&tree, "game/DATA/file.bin"), vec![Some(id)]);

    let sensitive = MountingTree::default();
    sensitive.mount("Game/Data", memory(&[]));
    assert!(candidates(&sensitive, "game/DATA/file.bin").is_empty());
}

#[test]
fn mounts_deeper_than_the_memoized_segments_still_match() {
    let tree = MountingTree::default();
    let depth = MEMOIZED_SEGMENTS + 3;
    let prefix: Vec<String> = (0..depth).map(|i| format!("d{i}")).collect();
    let prefix = prefix.join("/");
    let shallow = tree.mount("d0/d1", memory(&[]));
    let deep = tree.mount(&prefix, memory(&[]));
    let decoy = tree.mount(&format!("{prefix}x"), memory(&[]));

    let request = format!("{prefix}/leaf.txt");
    assert_eq!(candidates(&tree, &request), vec![Some(shallow), Some(deep)]);
    assert_ne!(deep, decoy);
}

#[test]
fn descriptors_report_logical_names() {
    let tree = MountingTree::default();
    tree.mount("data", memory(&[("a/b.txt", "hello")]));

    let desc = tree.try_get_desc("data/a/b.txt");
    assert_eq!(desc.snapshot.state, FileState::Normal);
    assert_eq!(desc.mounted_name, "data/a/b.txt");
    assert_eq!(desc.size, 5);
    assert!(tree.does_file_exist("data/a/b.txt"));
    assert!(!tree.does_file_exist("data/a/c.txt"));
    assert!(tree.try_translate("data/a/c.txt").is_some());
}

#[test]
fn empty_and_malformed_requests_have_no_candidates() {
    let tree = MountingTree::default();
    tree.mount("", memory(&[]));
    tree.set_default_file_system(Some(memory(&[])));
    assert!(candidates(&tree, "").is_empty());
    assert!(candidates(&tree, "1:/2:/x").is_empty());
}

#[test]
fn lookups_stay_consistent_under_concurrent_mounting() {
    let tree = Arc::new(MountingTree::default());
    let stable = tree.mount("stable", memory(&[("file.txt", "stable")]));
    let stop = Arc::new(AtomicBool::new(false));

    let churn = {
        let tree = tree.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let id = tree.mount("churn", memory(&[]));
                tree.unmount(id);
            }
        })
    };

    for _ in 0..2_000 {
        assert_eq!(
            tree.try_load_file("stable/file.txt").unwrap().as_slice(),
            b"stable"
        );
        let mut cursor = tree.lookup("stable/file.txt");
        match cursor.try_get_next() {
            LookupResult::Success(candidate) => assert_eq!(candidate.mount_id, Some(stable)),
            LookupResult::Invalidated => {}
            LookupResult::NoCandidates => panic!("stable mount vanished"),
        }
    }

    stop.store(true, Ordering::Relaxed);
    churn.join().unwrap();
}
