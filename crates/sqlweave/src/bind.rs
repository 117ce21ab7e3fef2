//! Result destinations.
//!
//! A statement carries an ordered list of destinations, one per selected
//! column. Executing the statement scans each row's columns into them in
//! order. Destinations are plain `&mut` borrows, so the borrow checker keeps
//! them alive for as long as the statement that writes into them.
//!
//! ```
//! use sqlweave::{from, record};
//!
//! #[derive(Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! record!(User { id => "id", name => "name" });
//!
//! let mut user = User::default();
//! let q = from("users").bind(&mut user).where_("id = ?", [42_i64]);
//! assert_eq!(q.sql(), "SELECT id, name FROM users WHERE id = ?");
//! assert_eq!(q.dest().len(), 2);
//! ```

use crate::position::Position;
use crate::stmt::Stmt;
use crate::value::{FromValue, TypeMismatch, Value};

/// A place a scanned column value is written to.
pub trait Dest: Send {
    fn assign(&mut self, value: Value) -> Result<(), TypeMismatch>;
}

impl<T: FromValue + Send> Dest for &mut T {
    fn assign(&mut self, value: Value) -> Result<(), TypeMismatch> {
        **self = T::from_value(value)?;
        Ok(())
    }
}

/// Appends one value per row to a vector.
///
/// ```
/// use sqlweave::{select, Collect};
///
/// let mut ids: Vec<i64> = Vec::new();
/// let q = select("id").to(Collect(&mut ids)).from("users");
/// assert_eq!(q.dest().len(), 1);
/// ```
pub struct Collect<'a, T>(pub &'a mut Vec<T>);

impl<T: FromValue + Send> Dest for Collect<'_, T> {
    fn assign(&mut self, value: Value) -> Result<(), TypeMismatch> {
        self.0.push(T::from_value(value)?);
        Ok(())
    }
}

/// A column of a [`Record`], or a group of columns from an embedded record.
pub enum Field<'a> {
    Column(&'static str, Box<dyn Dest + 'a>),
    Flatten(Vec<Field<'a>>),
}

impl<'a> Field<'a> {
    pub fn column<T: FromValue + Send>(name: &'static str, dest: &'a mut T) -> Self {
        Field::Column(name, Box::new(dest))
    }

    pub fn flatten(fields: Vec<Field<'a>>) -> Self {
        Field::Flatten(fields)
    }
}

/// A struct whose fields map to result columns.
///
/// Usually implemented with the [`record!`](crate::record) macro.
pub trait Record {
    /// Columns in select order, each paired with the field it scans into.
    fn fields(&mut self) -> Vec<Field<'_>>;
}

/// Implement [`Record`] for a struct.
///
/// Each entry is either `field => "column"` or `..field` for an embedded
/// struct that itself implements [`Record`]; its columns are added in place.
///
/// ```
/// use sqlweave::{record, Record};
///
/// #[derive(Default)]
/// struct Audit {
///     created_by: String,
/// }
/// record!(Audit { created_by => "created_by" });
///
/// #[derive(Default)]
/// struct Post {
///     id: i64,
///     audit: Audit,
///     title: String,
/// }
/// record!(Post { id => "id", ..audit, title => "title" });
///
/// let mut post = Post::default();
/// assert_eq!(post.fields().len(), 3);
/// ```
#[macro_export]
macro_rules! record {
    (@push $self:ident, $fields:ident; ) => {};
    (@push $self:ident, $fields:ident; $field:ident => $col:literal $(, $($rest:tt)*)?) => {
        $fields.push($crate::Field::column($col, &mut $self.$field));
        $crate::record!(@push $self, $fields; $($($rest)*)?);
    };
    (@push $self:ident, $fields:ident; .. $field:ident $(, $($rest:tt)*)?) => {
        $fields.push($crate::Field::flatten($crate::Record::fields(&mut $self.$field)));
        $crate::record!(@push $self, $fields; $($($rest)*)?);
    };
    ($ty:ty { $($body:tt)* }) => {
        impl $crate::Record for $ty {
            fn fields(&mut self) -> ::std::vec::Vec<$crate::Field<'_>> {
                let mut fields = ::std::vec::Vec::new();
                $crate::record!(@push self, fields; $($body)*);
                fields
            }
        }
    };
}

impl<'d> Stmt<'d> {
    /// Register a destination for the next result column.
    ///
    /// Destinations are filled in registration order, which must match the
    /// order of the selected columns.
    pub fn to(mut self, dest: impl Dest + 'd) -> Self {
        self.dest.push(Box::new(dest));
        self
    }

    /// Select every column of `record` and scan results into its fields.
    ///
    /// Embedded records are flattened in place.
    pub fn bind<R: Record + ?Sized>(mut self, record: &'d mut R) -> Self {
        let fields = R::fields(record);
        self.push_fields(fields);
        self
    }

    fn push_fields(&mut self, fields: Vec<Field<'d>>) {
        for field in fields {
            match field {
                Field::Column(name, dest) => {
                    self.add_chunk(Position::SELECT, "SELECT", name, (), ", ");
                    self.dest.push(dest);
                }
                Field::Flatten(inner) => self.push_fields(inner),
            }
        }
    }
}
