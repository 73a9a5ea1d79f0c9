use std::fs;
use std::path::Path;

/// markers that must not be left behind in comments
const MARKERS: [&str; 3] = ["TODO", "FIXME", "XXX"];

#[test]
fn no_leftover_markers() {
    let mut found = Vec::new();

    // search all rust source files, including unit test modules
    let src_dir = Path::new("src");
    if src_dir.exists() {
        search_dir(src_dir, &mut found);
    }

    if !found.is_empty() {
        eprintln!("\nfound {} leftover marker(s):", found.len());
        for (file, line_num, line) in &found {
            eprintln!("  {}:{}: {}", file, line_num, line.trim());
        }
        panic!("leftover markers must be resolved before tests pass");
    }
}

fn search_dir(dir: &Path, found: &mut Vec<(String, usize, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            search_dir(&path, found);
        } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            search_file(&path, found);
        }
    }
}

fn search_file(path: &Path, found: &mut Vec<(String, usize, String)>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    for (line_num, line) in content.lines().enumerate() {
        if comment_of(line).is_some_and(|comment| MARKERS.iter().any(|m| comment.contains(m))) {
            found.push((path.display().to_string(), line_num + 1, line.to_string()));
        }
    }
}

/// the comment part of a line: `//` and `/*` comments or block continuation lines
fn comment_of(line: &str) -> Option<&str> {
    if let Some(pos) = line.find("//").or_else(|| line.find("/*")) {
        return Some(&line[pos..]);
    }
    let trimmed = line.trim_start();
    (trimmed.starts_with('*') && !trimmed.starts_with("*/")).then_some(trimmed)
}
