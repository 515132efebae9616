//! Type conversion service.
//!
//! Literal values and resolved arguments are converted to the parameter or
//! property type a member declares. Converters are keyed by source and target
//! `TypeId`; a helper may delegate to a parent helper for pairs it does not
//! know.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean::{downcast, type_of, Bean};
use crate::error::{BoxError, DiError, DiResult};
use crate::key::TypeKey;

type ConverterFn = Arc<dyn Fn(&Bean) -> Result<Bean, BoxError> + Send + Sync>;

/// Registry of value converters.
///
/// ```rust
/// use beanwire::{bean, ConversionHelper};
///
/// let helper = ConversionHelper::new();
/// let port = helper.convert_to::<u16>(bean("8080")).unwrap();
/// assert_eq!(*port, 8080);
///
/// helper.register::<u16, String, _>(|v| Ok(format!(":{}", v)));
/// assert_eq!(*helper.convert_to::<String>(bean(80u16)).unwrap(), ":80");
/// ```
pub struct ConversionHelper {
    converters: RwLock<HashMap<(TypeId, TypeId), ConverterFn>>,
    parent: Option<Arc<ConversionHelper>>,
}

macro_rules! parse_from_strings {
    ($helper:expr, $($ty:ty),*) => {
        $(
            $helper.register::<String, $ty, _>(|s| parse::<$ty>(s));
            $helper.register::<&'static str, $ty, _>(|s| parse::<$ty>(s));
        )*
    };
}

macro_rules! widen {
    ($helper:expr, $from:ty => $($to:ty),*) => {
        $(
            $helper.register::<$from, $to, _>(|v| Ok(<$to>::from(*v)));
        )*
    };
}

macro_rules! display_to_string {
    ($helper:expr, $($ty:ty),*) => {
        $(
            $helper.register::<$ty, String, _>(|v| Ok(v.to_string()));
        )*
    };
}

fn parse<T>(text: &str) -> Result<T, BoxError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.trim().parse::<T>().map_err(|e| Box::new(e) as BoxError)
}

impl ConversionHelper {
    /// Helper with the default converters: strings parse into numbers,
    /// `bool` and `char`; integers widen losslessly; primitives format to
    /// `String`.
    pub fn new() -> Self {
        let helper = Self::empty();
        parse_from_strings!(
            helper, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
            bool, char
        );
        helper.register::<&'static str, String, _>(|s| Ok((*s).to_string()));
        widen!(helper, i8 => i16, i32, i64, f64);
        widen!(helper, i16 => i32, i64, f64);
        widen!(helper, i32 => i64, i128, f64);
        widen!(helper, u8 => u16, u32, u64, usize, i32, i64);
        widen!(helper, u16 => u32, u64, usize, i32, i64);
        widen!(helper, u32 => u64, i64, f64);
        widen!(helper, f32 => f64);
        display_to_string!(
            helper, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char
        );
        helper
    }

    /// Helper without any converters.
    pub fn empty() -> Self {
        ConversionHelper {
            converters: RwLock::new(HashMap::new()),
            parent: None,
        }
    }

    /// Empty helper that falls back to `parent` for unknown pairs.
    pub fn with_parent(parent: Arc<ConversionHelper>) -> Self {
        ConversionHelper {
            converters: RwLock::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    pub fn parent(&self) -> Option<&Arc<ConversionHelper>> {
        self.parent.as_ref()
    }

    /// Registers a converter from `S` to `T`, replacing an existing one.
    pub fn register<S, T, F>(&self, f: F)
    where
        S: Any + Send + Sync,
        T: Any + Send + Sync,
        F: Fn(&S) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let converter: ConverterFn = Arc::new(move |bean: &Bean| -> Result<Bean, BoxError> {
            let source = downcast::<S>(bean).ok_or("converter received a foreign value")?;
            f(&source).map(|v| Arc::new(v) as Bean)
        });
        self.converters
            .write()
            .insert((TypeId::of::<S>(), TypeId::of::<T>()), converter);
    }

    /// `true` if this helper or one of its parents converts `source` to
    /// `target`.
    pub fn can_convert(&self, source: TypeId, target: TypeKey) -> bool {
        source == target.id() || target == TypeKey::any() || self.lookup(source, target.id()).is_some()
    }

    fn lookup(&self, source: TypeId, target: TypeId) -> Option<ConverterFn> {
        if let Some(found) = self.converters.read().get(&(source, target)) {
            return Some(found.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(source, target))
    }

    /// Converts `bean` to the type identified by `target`.
    ///
    /// Values that already have the target type, and any value converted to
    /// [`TypeKey::any`], pass through unchanged.
    pub fn convert(&self, bean: Bean, target: TypeKey) -> DiResult<Bean> {
        let source = type_of(&bean);
        if source == target.id() || target == TypeKey::any() {
            return Ok(bean);
        }
        let converter = self.lookup(source, target.id()).ok_or_else(|| DiError::Conversion {
            target: target.name(),
            reason: "no converter registered for the value's type".to_string(),
        })?;
        converter(&bean).map_err(|e| DiError::Conversion {
            target: target.name(),
            reason: e.to_string(),
        })
    }

    pub fn convert_to<T: Any + Send + Sync>(&self, bean: Bean) -> DiResult<Arc<T>> {
        let converted = self.convert(bean, TypeKey::of::<T>())?;
        downcast::<T>(&converted).ok_or_else(|| DiError::Conversion {
            target: std::any::type_name::<T>(),
            reason: "converter produced a value of another type".to_string(),
        })
    }
}

impl Default for ConversionHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConversionHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionHelper")
            .field("converters", &self.converters.read().len())
            .field("parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::bean;

    #[test]
    fn strings_parse_into_primitives() {
        let helper = ConversionHelper::new();
        assert_eq!(*helper.convert_to::<i64>(bean(" 42 ".to_string())).unwrap(), 42);
        assert!(*helper.convert_to::<bool>(bean("true")).unwrap());
        assert_eq!(*helper.convert_to::<f64>(bean("1.5")).unwrap(), 1.5);

        let err = helper.convert_to::<u8>(bean("300")).unwrap_err();
        assert!(matches!(err, DiError::Conversion { target: "u8", .. }));
    }

    #[test]
    fn same_type_and_any_pass_through() {
        let helper = ConversionHelper::empty();
        let value = bean(vec![1u8, 2]);
        let same = helper.convert(value.clone(), TypeKey::of::<Vec<u8>>()).unwrap();
        assert!(crate::bean::same_bean(&value, &same));
        let any = helper.convert(value.clone(), TypeKey::any()).unwrap();
        assert!(crate::bean::same_bean(&value, &any));
        assert!(helper.convert(value, TypeKey::of::<String>()).is_err());
    }

    #[test]
    fn parent_supplies_unknown_pairs() {
        let parent = Arc::new(ConversionHelper::new());
        let child = ConversionHelper::with_parent(parent);
        child.register::<i32, String, _>(|v| Ok(format!("#{}", v)));

        assert_eq!(*child.convert_to::<String>(bean(7i32)).unwrap(), "#7");
        assert_eq!(*child.convert_to::<i64>(bean(7i32)).unwrap(), 7);
    }
}
