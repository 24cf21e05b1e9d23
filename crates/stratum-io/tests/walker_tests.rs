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

use std::sync::Arc;
use stratum_core::vfs::FileSystem;
use stratum_io::{Invalidated, MemoryFileSystem, MountingTree};

fn memory(files: &[&str]) -> Arc<dyn FileSystem> {
    let fs = MemoryFileSystem::new();
    for path in files {
        fs.insert(path, path.as_bytes().to_vec());
    }
    Arc::new(fs)
}

fn names<T>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<String> {
    let mut names: Vec<String> = items.iter().map(|i| name(i).to_owned()).collect();
    names.sort();
    names
}

#[test]
fn walk_merges_filesystems_mounted_at_the_same_point() {
    let tree = MountingTree::default();
    let loose = tree.mount("data", memory(&["a.txt", "textures/grass.dds"]));
    tree.mount("data", memory(&["a.txt", "b.txt", "models/ship.dae"]));

    let walker = tree.begin_walk("data");
    let files = walker.files().unwrap();
    assert_eq!(names(files, |f| f.name.as_str()), vec!["a.txt", "b.txt"]);

    let a = files.iter().find(|f| f.name == "a.txt").unwrap();
    assert_eq!(a.mount_id, Some(loose));
    assert_eq!(a.desc.mounted_name, "data/a.txt");

    let directories = walker.directories().unwrap();
    let mut dir_names: Vec<&str> = directories.iter().map(|d| d.name.as_str()).collect();
    dir_names.sort();
    assert_eq!(dir_names, vec!["models", "textures"]);
}

#[test]
fn deeper_mount_points_appear_as_directories() {
    let tree = MountingTree::default();
    tree.mount("game/data/textures", memory(&["grass.dds"]));
    tree.mount("game", memory(&["boot.cfg", "data/config.ini"]));

    let root = tree.begin_walk("");
    let top: Vec<String> = root
        .directories()
        .unwrap()
        .iter()
        .map(|d| d.name.clone())
        .collect();
    assert_eq!(top, vec!["game"]);
    assert_eq!(root.directories().unwrap()[0].source_count(), 2);
    assert!(root.files().unwrap().is_empty());

    let game = root.recurse_to("game").unwrap();
    assert_eq!(names(game.files().unwrap(), |f| f.name.as_str()), vec!["boot.cfg"]);

    let data = game.recurse_to("data").unwrap();
    assert_eq!(names(data.files().unwrap(), |f| f.name.as_str()), vec!["config.ini"]);

    let textures = data.recurse_to("textures").unwrap();
    let files = textures.files().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].desc.mounted_name, "game/data/textures/grass.dds");
}

#[test]
fn walking_inside_a_mount_starts_at_the_internal_point() {
    let tree = MountingTree::default();
    tree.mount("data", memory(&["textures/ui/cursor.png", "textures/grass.dds"]));

    let walker = tree.begin_walk("data/textures");
    assert_eq!(names(walker.files().unwrap(), |f| f.name.as_str()), vec!["grass.dds"]);
    let ui = walker.recurse_to("ui").unwrap();
    assert_eq!(names(ui.files().unwrap(), |f| f.name.as_str()), vec!["cursor.png"]);
}

#[test]
fn qualified_walks_use_exactly_one_filesystem() {
    let tree = MountingTree::default();
    tree.mount("data", memory(&["first.txt"]));
    let second = tree.mount("data", memory(&["second.txt"]));

    let walker = tree.begin_walk(&format!("{}:", second.value()));
    assert_eq!(walker.file_system_count(), 1);
    assert_eq!(names(walker.files().unwrap(), |f| f.name.as_str()), vec!["second.txt"]);
}

#[test]
fn unknown_directories_yield_empty_walkers() {
    let tree = MountingTree::default();
    tree.mount("data", memory(&["a.txt"]));
    let walker = tree.begin_walk("data").recurse_to("nope").unwrap();
    assert_eq!(walker.file_system_count(), 0);
    assert!(walker.files().unwrap().is_empty());
}

#[test]
fn walks_are_invalidated_by_mount_changes() {
    let tree = MountingTree::default();
    let id = tree.mount("data", memory(&["a.txt"]));
    let walker = tree.begin_walk("data");
    assert_eq!(walker.files().unwrap().len(), 1);

    tree.unmount(id);

    assert!(walker.is_invalidated());
    assert_eq!(walker.files().unwrap_err(), Invalidated);
    assert!(walker.directories().is_err());
    assert!(walker.recurse_to("x").is_err());
}
