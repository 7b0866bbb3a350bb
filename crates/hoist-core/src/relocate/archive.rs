//! Built-in relocation engine over packaged (zip) artifacts.
//!
//! Moves namespace-qualified entry paths under a rewritten prefix and rewrites
//! class entries structurally via their constant pools. Resources under a
//! moved prefix move with it; everything else is copied through unchanged.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::classfile;
use super::rule::CanonicalRule;
use super::sandbox::RelocationEngine;

/// In-process structural rewriter. Stateless; safe to share across tasks.
pub struct ArchiveRewriter;

impl RelocationEngine for ArchiveRewriter {
    fn relocate(&self, input: &Path, output: &Path, rules: &[CanonicalRule]) -> Result<()> {
        let reader = File::open(input)
            .with_context(|| format!("failed to open artifact {}", input.display()))?;
        let mut archive = ZipArchive::new(reader)
            .with_context(|| format!("malformed artifact {}", input.display()))?;
        let writer = File::create(output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        let mut out = ZipWriter::new(writer);

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let new_name = relocate_entry_path(&name, rules);

            if entry.is_dir() {
                out.add_directory(new_name, SimpleFileOptions::default())?;
                continue;
            }

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            if name.ends_with(".class") {
                bytes = classfile::rewrite(&bytes, rules)
                    .with_context(|| format!("rewriting entry {}", name))?;
            }
            out.start_file(new_name, SimpleFileOptions::default())?;
            out.write_all(&bytes)?;
        }

        out.finish()?;
        Ok(())
    }
}

fn relocate_entry_path(name: &str, rules: &[CanonicalRule]) -> String {
    for rule in rules {
        let from = format!("{}/", rule.from_internal());
        if let Some(rest) = name.strip_prefix(&from) {
            return format!("{}/{}", rule.to_internal(), rest);
        }
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocate::classfile::testutil;

    fn rules() -> Vec<CanonicalRule> {
        vec![CanonicalRule {
            from: "org.acme".to_string(),
            to: "com.host.libs.acme".to_string(),
        }]
    }

    fn build_jar(path: &Path) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        writer
            .add_directory("org/acme/", SimpleFileOptions::default())
            .unwrap();
        writer
            .start_file("org/acme/Foo.class", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&testutil::sample_class()).unwrap();
        writer
            .start_file("org/acme/data.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"payload").unwrap();
        writer
            .start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"Manifest-Version: 1.0\n").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn entry_paths_move_under_rewritten_prefix() {
        assert_eq!(
            relocate_entry_path("org/acme/Foo.class", &rules()),
            "com/host/libs/acme/Foo.class"
        );
        assert_eq!(relocate_entry_path("org/acme/", &rules()), "com/host/libs/acme/");
        assert_eq!(relocate_entry_path("org/acme2/X.class", &rules()), "org/acme2/X.class");
        assert_eq!(
            relocate_entry_path("META-INF/MANIFEST.MF", &rules()),
            "META-INF/MANIFEST.MF"
        );
    }

    #[test]
    fn relocates_archive_contents() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("widget-1.0.jar");
        let output = dir.path().join("widget-1.0-relocated.jar");
        build_jar(&input);

        ArchiveRewriter.relocate(&input, &output, &rules()).unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"com/host/libs/acme/Foo.class".to_string()));
        assert!(names.contains(&"com/host/libs/acme/data.txt".to_string()));
        assert!(names.contains(&"META-INF/MANIFEST.MF".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("org/acme/")));

        let mut class_bytes = Vec::new();
        archive
            .by_name("com/host/libs/acme/Foo.class")
            .unwrap()
            .read_to_end(&mut class_bytes)
            .unwrap();
        let needle = b"com/host/libs/acme/Foo";
        assert!(class_bytes.windows(needle.len()).any(|w| w == needle));

        let mut resource = Vec::new();
        archive
            .by_name("com/host/libs/acme/data.txt")
            .unwrap()
            .read_to_end(&mut resource)
            .unwrap();
        assert_eq!(resource, b"payload");
    }

    #[test]
    fn malformed_class_entry_fails_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.jar");
        let output = dir.path().join("broken-relocated.jar");
        let mut writer = ZipWriter::new(File::create(&input).unwrap());
        writer
            .start_file("org/acme/Bad.class", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"definitely not bytecode").unwrap();
        writer.finish().unwrap();

        assert!(ArchiveRewriter.relocate(&input, &output, &rules()).is_err());
    }
}
