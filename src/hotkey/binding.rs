//! Hotkey bindings: keys, cooldown, callback and its arguments

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoordinatorError;
use crate::keys::KeySet;

/// Index of a hotkey in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotkeyId(pub(crate) usize);

impl HotkeyId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for HotkeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Positional and named arguments handed to a callback on every run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Args {
    #[serde(default)]
    pub positional: Vec<Value>,
    #[serde(default)]
    pub named: Map<String, Value>,
}

impl Args {
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Function run when a hotkey fires
pub type Callback = Arc<dyn Fn(&Args) -> anyhow::Result<()> + Send + Sync>;

/// A validated binding of a key combination to a callback
#[derive(Clone)]
pub struct HotkeyBinding {
    pub(crate) keys: KeySet,
    pub(crate) cooldown: Option<Duration>,
    pub(crate) callback: Callback,
    pub(crate) args: Args,
    pub(crate) label: String,
}

impl HotkeyBinding {
    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn args(&self) -> &Args {
        &self.args
    }
}

impl fmt::Debug for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotkeyBinding")
            .field("keys", &self.keys)
            .field("cooldown", &self.cooldown)
            .field("args", &self.args)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Builder for a `HotkeyBinding`
///
/// ```
/// use std::time::Duration;
/// use inpututil::{HotkeyBuilder, KeyCode};
///
/// let binding = HotkeyBuilder::new()
///     .keys([KeyCode::CONTROL, KeyCode::MENU, KeyCode::KEY_K])
///     .cooldown(Duration::from_millis(100))
///     .arg("hello")
///     .callback(|args| {
///         println!("{:?}", args.get(0));
///         Ok(())
///     })
///     .build()
///     .unwrap();
/// assert_eq!(binding.label(), "CONTROL+MENU+KEY_K");
/// ```
#[derive(Default)]
pub struct HotkeyBuilder {
    keys: Option<KeySet>,
    cooldown: Option<Duration>,
    callback: Option<Callback>,
    args: Args,
    label: Option<String>,
}

impl HotkeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys that must be held together; a single key or a collection
    pub fn keys(mut self, keys: impl Into<KeySet>) -> Self {
        self.keys = Some(keys.into());
        self
    }

    /// Time to wait after a run before the hotkey can fire again
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.positional.push(value.into());
        self
    }

    /// Set a named argument
    pub fn named_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.named.insert(name.into(), value.into());
        self
    }

    /// Replace all arguments at once
    pub fn args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// Name used in logs and events; defaults to the key combination
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn build(self) -> Result<HotkeyBinding, CoordinatorError> {
        let keys = self
            .keys
            .ok_or_else(|| CoordinatorError::invalid_argument("'keys' must be given"))?;
        if keys.is_empty() {
            return Err(CoordinatorError::invalid_argument(
                "'keys' must contain at least one key code",
            ));
        }
        let callback = self
            .callback
            .ok_or_else(|| CoordinatorError::invalid_argument("'callback' must be given"))?;
        let label = self.label.unwrap_or_else(|| keys.to_string());

        Ok(HotkeyBinding {
            keys,
            cooldown: self.cooldown,
            callback,
            args: self.args,
            label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyCode;

    fn noop(_: &Args) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_build_requires_keys() {
        let err = HotkeyBuilder::new().callback(noop).build().unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidArgument(_)));
    }

    #[test]
    fn test_build_rejects_empty_keys() {
        let err = HotkeyBuilder::new()
            .keys(Vec::<KeyCode>::new())
            .callback(noop)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidArgument(_)));
    }

    #[test]
    fn test_build_requires_callback() {
        let err = HotkeyBuilder::new().keys(KeyCode::F1).build().unwrap_err();
        assert_eq!(err, CoordinatorError::invalid_argument("'callback' must be given"));
    }

    #[test]
    fn test_build_with_args() {
        let binding = HotkeyBuilder::new()
            .keys(KeyCode::F2)
            .arg(1)
            .arg("two")
            .named_arg("verbose", true)
            .label("refresh")
            .callback(noop)
            .build()
            .unwrap();

        assert_eq!(binding.label(), "refresh");
        assert_eq!(binding.args().get(1), Some(&Value::from("two")));
        assert_eq!(binding.args().named("verbose"), Some(&Value::Bool(true)));
        assert!(binding.cooldown.is_none());
    }

    #[test]
    fn test_default_label_is_key_combination() {
        let binding = HotkeyBuilder::new()
            .keys([KeyCode::LSHIFT, KeyCode::F3])
            .callback(noop)
            .build()
            .unwrap();
        assert_eq!(binding.label(), "LSHIFT+F3");
    }
}
