use shared::types::Result;

/// Durable string storage addressed by namespace, the role browser local
/// storage plays for a web client. Writes replace the whole value.
pub trait KeyValueStore {
    fn read(&self, namespace: &str) -> Result<Option<String>>;
    fn write(&self, namespace: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn read(&self, namespace: &str) -> Result<Option<String>> {
        (**self).read(namespace)
    }

    fn write(&self, namespace: &str, value: &str) -> Result<()> {
        (**self).write(namespace, value)
    }
}
