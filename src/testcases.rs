//! Test-Case Loader (C3, §4.3): enumerates a problem's test data directory
//! from the local filesystem rooted at `data/problems/<pid>/`.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::DispatchError;
use crate::model::TestCase;

/// Root of the test-data tree; the dispatcher only ever reads beneath it.
#[derive(Clone)]
pub struct TestDataRoot {
    base: PathBuf,
}

impl TestDataRoot {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn problem_dir(&self, problem_id: i64) -> PathBuf {
        self.base.join("problems").join(problem_id.to_string())
    }

    /// Path to the problem's SPJ source, required iff `useSPJ`.
    pub fn spj_path(&self, problem_id: i64) -> PathBuf {
        self.problem_dir(problem_id).join("spj.cpp")
    }

    /// Load every `<name>.in`/`<name>.out` pair, ordered by filename.
    /// Empty set is a fatal `NoTestData` error (§4.3).
    pub async fn load_test_cases(&self, problem_id: i64) -> Result<Vec<TestCase>, DispatchError> {
        let data_dir = self.problem_dir(problem_id).join("data");

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&data_dir)
            .await
            .map_err(|_| DispatchError::NoTestData(problem_id))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|_| DispatchError::NoTestData(problem_id))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("in") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }

        if names.is_empty() {
            return Err(DispatchError::NoTestData(problem_id));
        }
        names.sort();

        let mut cases = Vec::with_capacity(names.len());
        for name in names {
            let input = read_to_string(&data_dir.join(format!("{name}.in")))
                .await
                .map_err(|_| DispatchError::NoTestData(problem_id))?;
            let expected_output = read_to_string(&data_dir.join(format!("{name}.out")))
                .await
                .map_err(|_| DispatchError::NoTestData(problem_id))?;
            cases.push(TestCase {
                name,
                input,
                expected_output,
            });
        }

        Ok(cases)
    }
}

async fn read_to_string(path: &Path) -> std::io::Result<String> {
    fs::read_to_string(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_case(dir: &Path, name: &str, input: &str, output: &str) {
        let mut f = std::fs::File::create(dir.join(format!("{name}.in"))).unwrap();
        f.write_all(input.as_bytes()).unwrap();
        let mut f = std::fs::File::create(dir.join(format!("{name}.out"))).unwrap();
        f.write_all(output.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn loads_cases_ordered_by_filename() {
        let root = TempDir::new().unwrap();
        let data_dir = root.path().join("problems").join("7").join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        write_case(&data_dir, "2", "b\n", "b\n");
        write_case(&data_dir, "1", "a\n", "a\n");

        let loader = TestDataRoot::new(root.path());
        let cases = loader.load_test_cases(7).await.unwrap();

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "1");
        assert_eq!(cases[1].name, "2");
    }

    #[tokio::test]
    async fn empty_data_directory_is_no_test_data() {
        let root = TempDir::new().unwrap();
        let data_dir = root.path().join("problems").join("9").join("data");
        std::fs::create_dir_all(&data_dir).unwrap();

        let loader = TestDataRoot::new(root.path());
        let err = loader.load_test_cases(9).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoTestData(9)));
    }

    #[tokio::test]
    async fn missing_problem_directory_is_no_test_data() {
        let root = TempDir::new().unwrap();
        let loader = TestDataRoot::new(root.path());
        let err = loader.load_test_cases(404).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoTestData(404)));
    }
}
