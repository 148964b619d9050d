use std::collections::BTreeMap;

use crate::types::RowValues;

/// Field name → value map; the unit CRUD helpers and row mapping work with.
pub type FieldMap = BTreeMap<String, RowValues>;

/// Arguments supplied alongside a SQL template.
///
/// `%kind` tokens consume positional values left to right. `{n}` indexes the positional list
/// (1-based) and `{name}` looks a key up in the named form.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Args {
    #[default]
    None,
    Positional(Vec<RowValues>),
    Named(FieldMap),
}

impl Args {
    /// Positional arguments from anything convertible to [`RowValues`].
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        Args::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Named arguments from `(key, value)` pairs.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RowValues>,
    {
        Args::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Args::None => 0,
            Args::Positional(values) => values.len(),
            Args::Named(map) => map.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn nth(&self, index: usize) -> Option<&RowValues> {
        match self {
            Args::Positional(values) => values.get(index),
            Args::None | Args::Named(_) => None,
        }
    }

    pub(crate) fn by_name(&self, name: &str) -> Option<&RowValues> {
        match self {
            Args::Named(map) => map.get(name),
            Args::None | Args::Positional(_) => None,
        }
    }

    pub(crate) fn is_named(&self) -> bool {
        matches!(self, Args::Named(_))
    }
}

impl From<Vec<RowValues>> for Args {
    fn from(values: Vec<RowValues>) -> Self {
        Args::Positional(values)
    }
}

impl From<&[RowValues]> for Args {
    fn from(values: &[RowValues]) -> Self {
        Args::Positional(values.to_vec())
    }
}

impl<const N: usize> From<[RowValues; N]> for Args {
    fn from(values: [RowValues; N]) -> Self {
        Args::Positional(values.into())
    }
}

impl From<FieldMap> for Args {
    fn from(map: FieldMap) -> Self {
        Args::Named(map)
    }
}

impl From<&Args> for Args {
    fn from(args: &Args) -> Self {
        args.clone()
    }
}

impl From<()> for Args {
    fn from((): ()) -> Self {
        Args::None
    }
}
