//! Fixture entities and deterministic data generation.
//!
//! The fixture set covers every key shape the mapper supports: identity keys
//! under a custom name, renamed tables, reserved-word columns, assigned string
//! and integer keys, nullable dates and a composite key.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use crudkit_core::{
    Entity, EntityMapping, Error, FieldMapping, FromValue, Result, Row, ScalarType, Value,
};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scale factor for generated data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scale {
    /// 10 rows, for quick checks.
    Tiny,
    /// 500 rows.
    #[default]
    Small,
    /// 5,000 rows.
    Medium,
}

impl Scale {
    /// Row count for this scale.
    pub fn count(&self) -> usize {
        match self {
            Scale::Tiny => 10,
            Scale::Small => 500,
            Scale::Medium => 5_000,
        }
    }
}

macro_rules! named_fixture {
    (
        $(#[$meta:meta])*
        $ty:ident, table = $table:literal,
        key = $key:ident: $key_ty:ty => ($key_field:literal, $scalar:expr) $(.$annot:ident())?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $ty {
            pub $key: $key_ty,
            pub name: String,
        }

        impl Entity for $ty {
            fn mapping() -> EntityMapping {
                EntityMapping::new(stringify!($ty))
                    .table($table)
                    .field(FieldMapping::new($key_field, $scalar)$(.$annot())?)
                    .field(FieldMapping::new("Name", ScalarType::String))
            }

            fn to_values(&self) -> Vec<(&'static str, Value)> {
                vec![
                    ($key_field, self.$key.clone().into()),
                    ("Name", self.name.clone().into()),
                ]
            }

            fn from_row(row: &Row) -> Result<Self> {
                Ok(Self {
                    $key: row.get($key_field)?,
                    name: row.get("Name")?,
                })
            }

            fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
                match field {
                    $key_field => self.$key = <$key_ty>::from_value(value)?,
                    other => return Err(unknown_field(stringify!($ty), other)),
                }
                Ok(())
            }
        }
    };
}

fn unknown_field(entity: &str, field: &str) -> Error {
    Error::mapping(entity, format!("no settable field {field}"))
}

named_fixture!(
    /// Identity key with a renamed table.
    Person, table = "People", key = id: i32 => ("Id", ScalarType::Int32)
);

named_fixture!(
    /// Table name unrelated to the type name.
    Car, table = "Automobiles", key = id: i32 => ("Id", ScalarType::Int32)
);

named_fixture!(
    /// String key found by the `<TypeName>Id` convention.
    ObjectX, table = "ObjectX", key = object_x_id: String => ("ObjectXId", ScalarType::String)
);

named_fixture!(
    /// Integer key supplied by the caller.
    ObjectY, table = "ObjectY",
    key = object_y_id: i32 => ("ObjectYId", ScalarType::Int32).assigned_key()
);

named_fixture!(
    /// Integer `Id` supplied by the caller.
    ObjectZ, table = "ObjectZ", key = id: i32 => ("Id", ScalarType::Int32).assigned_key()
);

named_fixture!(
    /// String `Id`, assigned by convention.
    GenericType, table = "GenericType", key = id: String => ("Id", ScalarType::String)
);

/// Identity key under a custom name, plus a nullable timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stuff {
    pub the_id: i16,
    pub name: String,
    pub created: Option<NaiveDateTime>,
}

impl Entity for Stuff {
    fn mapping() -> EntityMapping {
        EntityMapping::new("Stuff")
            .field(FieldMapping::new("TheId", ScalarType::Int32).identity_key())
            .field(FieldMapping::new("Name", ScalarType::String))
            .field(FieldMapping::optional("Created", ScalarType::DateTime))
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("TheId", i32::from(self.the_id).into()),
            ("Name", self.name.clone().into()),
            ("Created", self.created.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            the_id: narrow(row.get::<i32>("TheId")?)?,
            name: row.get("Name")?,
            created: row.get("Created")?,
        })
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "TheId" => self.the_id = narrow(i32::from_value(value)?)?,
            other => return Err(unknown_field("Stuff", other)),
        }
        Ok(())
    }
}

fn narrow(value: i32) -> Result<i16> {
    i16::try_from(value).map_err(|_| Error::conversion("int16", "int32"))
}

/// Identity key with an extra integer column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub age: i32,
}

impl Entity for User {
    fn mapping() -> EntityMapping {
        EntityMapping::new("User")
            .table("Users")
            .field(FieldMapping::new("Id", ScalarType::Int32))
            .field(FieldMapping::new("Name", ScalarType::String))
            .field(FieldMapping::new("Age", ScalarType::Int32))
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("Id", self.id.into()),
            ("Name", self.name.clone().into()),
            ("Age", self.age.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get("Id")?,
            name: row.get("Name")?,
            age: row.get("Age")?,
        })
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "Id" => self.id = i32::from_value(value)?,
            other => return Err(unknown_field("User", other)),
        }
        Ok(())
    }
}

/// `Order` is reserved in every supported dialect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    pub id: i32,
    pub name: String,
    pub order: i32,
}

impl Entity for ResultRow {
    fn mapping() -> EntityMapping {
        EntityMapping::new("ResultRow")
            .table("Results")
            .field(FieldMapping::new("Id", ScalarType::Int32))
            .field(FieldMapping::new("Name", ScalarType::String))
            .field(FieldMapping::new("Order", ScalarType::Int32))
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("Id", self.id.into()),
            ("Name", self.name.clone().into()),
            ("Order", self.order.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get("Id")?,
            name: row.get("Name")?,
            order: row.get("Order")?,
        })
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "Id" => self.id = i32::from_value(value)?,
            other => return Err(unknown_field("ResultRow", other)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NullableDate {
    pub id: i32,
    pub date_value: Option<NaiveDateTime>,
}

impl Entity for NullableDate {
    fn mapping() -> EntityMapping {
        EntityMapping::new("NullableDate")
            .table("NullableDates")
            .field(FieldMapping::new("Id", ScalarType::Int32))
            .field(FieldMapping::optional("DateValue", ScalarType::DateTime))
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![("Id", self.id.into()), ("DateValue", self.date_value.into())]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get("Id")?,
            date_value: row.get("DateValue")?,
        })
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "Id" => self.id = i32::from_value(value)?,
            other => return Err(unknown_field("NullableDate", other)),
        }
        Ok(())
    }
}

/// Two caller-supplied key columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Membership {
    pub group_id: i32,
    pub user_id: i32,
    pub role: String,
}

impl Entity for Membership {
    fn mapping() -> EntityMapping {
        EntityMapping::new("Membership")
            .table("Memberships")
            .field(FieldMapping::new("GroupId", ScalarType::Int32).assigned_key())
            .field(FieldMapping::new("UserId", ScalarType::Int32).assigned_key())
            .field(FieldMapping::new("Role", ScalarType::String))
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("GroupId", self.group_id.into()),
            ("UserId", self.user_id.into()),
            ("Role", self.role.clone().into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            group_id: row.get("GroupId")?,
            user_id: row.get("UserId")?,
            role: row.get("Role")?,
        })
    }

    fn set_field(&mut self, field: &str, _value: Value) -> Result<()> {
        Err(unknown_field("Membership", field))
    }
}

/// Wide row used by the benchmarks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: i32,
    pub text: String,
    pub creation_date: NaiveDateTime,
    pub last_change_date: NaiveDateTime,
    pub counters: [Option<i32>; 9],
}

const POST_COUNTERS: [&str; 9] = [
    "Counter1", "Counter2", "Counter3", "Counter4", "Counter5", "Counter6", "Counter7",
    "Counter8", "Counter9",
];

impl Entity for Post {
    fn mapping() -> EntityMapping {
        EntityMapping::new("Post")
            .table("Posts")
            .field(FieldMapping::new("Id", ScalarType::Int32))
            .field(FieldMapping::new("Text", ScalarType::String))
            .field(FieldMapping::new("CreationDate", ScalarType::DateTime))
            .field(FieldMapping::new("LastChangeDate", ScalarType::DateTime))
            .fields(
                POST_COUNTERS
                    .iter()
                    .map(|name| FieldMapping::optional(*name, ScalarType::Int32)),
            )
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        let mut values = vec![
            ("Id", self.id.into()),
            ("Text", self.text.clone().into()),
            ("CreationDate", self.creation_date.into()),
            ("LastChangeDate", self.last_change_date.into()),
        ];
        values.extend(
            POST_COUNTERS
                .iter()
                .zip(self.counters)
                .map(|(name, counter)| (*name, Value::from(counter))),
        );
        values
    }

    fn from_row(row: &Row) -> Result<Self> {
        let mut counters = [None; 9];
        for (slot, name) in counters.iter_mut().zip(POST_COUNTERS) {
            *slot = row.get(name)?;
        }
        Ok(Self {
            id: row.get("Id")?,
            text: row.get("Text")?,
            creation_date: row.get("CreationDate")?,
            last_change_date: row.get("LastChangeDate")?,
            counters,
        })
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "Id" => self.id = i32::from_value(value)?,
            other => return Err(unknown_field("Post", other)),
        }
        Ok(())
    }
}

/// Every fixture type, addressable by name from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixture {
    Stuff,
    Person,
    User,
    Car,
    ResultRow,
    ObjectX,
    ObjectY,
    ObjectZ,
    GenericType,
    NullableDate,
    Membership,
    Post,
}

impl Fixture {
    /// All fixtures, in schema creation order.
    pub const ALL: [Fixture; 12] = [
        Fixture::Stuff,
        Fixture::Person,
        Fixture::User,
        Fixture::Car,
        Fixture::ResultRow,
        Fixture::ObjectX,
        Fixture::ObjectY,
        Fixture::ObjectZ,
        Fixture::GenericType,
        Fixture::NullableDate,
        Fixture::Membership,
        Fixture::Post,
    ];

    /// Entity type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Fixture::Stuff => "Stuff",
            Fixture::Person => "Person",
            Fixture::User => "User",
            Fixture::Car => "Car",
            Fixture::ResultRow => "ResultRow",
            Fixture::ObjectX => "ObjectX",
            Fixture::ObjectY => "ObjectY",
            Fixture::ObjectZ => "ObjectZ",
            Fixture::GenericType => "GenericType",
            Fixture::NullableDate => "NullableDate",
            Fixture::Membership => "Membership",
            Fixture::Post => "Post",
        }
    }

    /// The fixture's entity mapping.
    pub fn mapping(&self) -> EntityMapping {
        match self {
            Fixture::Stuff => Stuff::mapping(),
            Fixture::Person => Person::mapping(),
            Fixture::User => User::mapping(),
            Fixture::Car => Car::mapping(),
            Fixture::ResultRow => ResultRow::mapping(),
            Fixture::ObjectX => ObjectX::mapping(),
            Fixture::ObjectY => ObjectY::mapping(),
            Fixture::ObjectZ => ObjectZ::mapping(),
            Fixture::GenericType => GenericType::mapping(),
            Fixture::NullableDate => NullableDate::mapping(),
            Fixture::Membership => Membership::mapping(),
            Fixture::Post => Post::mapping(),
        }
    }

    /// Table name the fixture maps to.
    pub fn table(&self) -> String {
        let mapping = self.mapping();
        mapping.table.unwrap_or(mapping.type_name)
    }
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for Fixture {
    type Err = Error;

    /// Accepts the type name or the table name, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Fixture::ALL
            .into_iter()
            .find(|f| f.type_name().eq_ignore_ascii_case(s) || f.table().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown fixture '{s}'")))
    }
}

/// Generate a random alphanumeric string.
fn random_string(rng: &mut StdRng, len: usize) -> String {
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

/// Generate posts with unset ids, reproducibly.
pub fn generate_posts(count: usize) -> Vec<Post> {
    const SEED: u64 = 12345;
    let mut rng = StdRng::seed_from_u64(SEED);
    let epoch = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    (0..count)
        .map(|i| {
            let creation_date = epoch + Duration::seconds(rng.gen_range(0..86_400 * 365));
            let last_change_date = creation_date + Duration::seconds(rng.gen_range(0..86_400));
            let mut counters = [None; 9];
            for counter in counters.iter_mut() {
                if rng.gen_bool(0.5) {
                    *counter = Some(rng.gen_range(0..1_000));
                }
            }
            let len = 20 + (i % 80);

            Post {
                id: 0,
                text: random_string(&mut rng, len),
                creation_date,
                last_change_date,
                counters,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_core::{KeyPolicy, TableDescriptor};

    #[test]
    fn test_fixture_key_policies() {
        let policy = |f: Fixture| TableDescriptor::build(&f.mapping()).unwrap().key_policy;

        assert_eq!(policy(Fixture::Stuff), KeyPolicy::Identity);
        assert_eq!(policy(Fixture::User), KeyPolicy::Identity);
        assert_eq!(policy(Fixture::ObjectX), KeyPolicy::Assigned);
        assert_eq!(policy(Fixture::ObjectY), KeyPolicy::Assigned);
        assert_eq!(policy(Fixture::ObjectZ), KeyPolicy::Assigned);
        assert_eq!(policy(Fixture::GenericType), KeyPolicy::Assigned);
        assert_eq!(policy(Fixture::Membership), KeyPolicy::Composite);
    }

    #[test]
    fn test_fixture_from_str() {
        assert_eq!("automobiles".parse::<Fixture>().unwrap(), Fixture::Car);
        assert_eq!("Car".parse::<Fixture>().unwrap(), Fixture::Car);
        assert_eq!("results".parse::<Fixture>().unwrap(), Fixture::ResultRow);
        assert!("Nope".parse::<Fixture>().is_err());
    }

    #[test]
    fn test_generate_posts_deterministic() {
        let a = generate_posts(20);
        let b = generate_posts(20);
        assert_eq!(a, b);
        assert!(a.iter().all(|p| p.id == 0 && p.last_change_date >= p.creation_date));
        assert!(a.iter().all(|p| p.text.len() >= 20));
    }

    #[test]
    fn test_post_values_cover_mapping() {
        let post = &generate_posts(1)[0];
        let values = post.to_values();
        let mapping = Post::mapping();
        assert_eq!(values.len(), mapping.fields.len());
        for (name, _) in &values {
            assert!(mapping.get_field(name).is_some(), "{name}");
        }
    }
}
