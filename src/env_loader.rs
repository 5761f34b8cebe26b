use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(docgist_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    let base = docgist_home.or(home_dir)?;
    Some(base.join(".docgist/.env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("DOCGIST_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_prefers_docgist_home_over_home_dir() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/srv/docgist")),
            Some(PathBuf::from("/home/alice")),
        );

        let want = Some(PathBuf::from("/srv/docgist/.docgist/.env"));
        assert_eq!(got, want);
    }

    #[test]
    fn fallback_uses_home_when_docgist_home_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice")));
        let want = Some(PathBuf::from("/home/alice/.docgist/.env"));
        assert_eq!(got, want);
    }
}
