use config::Source;

/// Builds a typed config from user supplied sources layered over the crate's embedded defaults.
pub trait ConfigBuilder: Sized {
    type C;

    fn add_source<T>(self, source: T) -> anyhow::Result<Self>
        where
            T: Source + Send + Sync + 'static;

    fn build(self) -> anyhow::Result<Self::C>;
}
