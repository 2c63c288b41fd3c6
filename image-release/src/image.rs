use std::fmt;

/// A repository and tag pair such as `neonlabsorg/accountsdb:stable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        ImageRef {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Returns a reference to the same repository under a different tag.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        ImageRef::new(self.repository.clone(), tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{repository}:{tag}",
            repository = self.repository,
            tag = self.tag
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let image = ImageRef::new("neonlabsorg/accountsdb", "stable");
        assert_eq!(image.to_string(), "neonlabsorg/accountsdb:stable");
    }

    #[test]
    fn test_with_tag() {
        let image = ImageRef::new("registry.io:5000/my-image", "0123abcd");
        assert_eq!(
            image.with_tag("latest").to_string(),
            "registry.io:5000/my-image:latest"
        );
        assert_eq!(image.tag, "0123abcd");
    }
}
