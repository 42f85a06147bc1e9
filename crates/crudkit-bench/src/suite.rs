//! Shared CRUD suite.
//!
//! Every check runs against a cleared fixture schema and reports pass or
//! fail with a reason. The suite never stops early.

use std::fmt::Debug;
use std::time::Instant;

use chrono::NaiveDate;
use crudkit_core::{Entity, Error, Key, Result as MapperResult, Value};
use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{info, warn};

use crate::fixtures::{
    Car, GenericType, Membership, NullableDate, ObjectX, ObjectY, ObjectZ, Person, ResultRow,
    Stuff, User,
};
use crate::harness::TestContext;

/// Why a check failed.
#[derive(Debug, ThisError)]
pub enum CheckError {
    /// The mapper returned an error the check did not expect.
    #[error(transparent)]
    Mapper(#[from] Error),

    /// An expectation did not hold.
    #[error("{0}")]
    Assertion(String),
}

type CheckResult = std::result::Result<(), CheckError>;

/// Outcome of one check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: Option<String>,
    pub elapsed_us: u64,
}

/// Outcomes of a full suite run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub checks: Vec<CheckOutcome>,
}

impl SuiteReport {
    /// Number of passing checks.
    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Number of failing checks.
    pub fn failed(&self) -> usize {
        self.checks.len() - self.passed()
    }

    /// Check if every check passed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

type Check = fn(&mut TestContext) -> CheckResult;

const CHECKS: &[(&str, Check)] = &[
    ("identity_crud_round_trip", identity_crud_round_trip),
    ("custom_identity_name", custom_identity_name),
    ("table_name_override", table_name_override),
    ("reserved_word_column", reserved_word_column),
    ("string_assigned_key", string_assigned_key),
    ("int_assigned_key", int_assigned_key),
    ("assigned_id_field", assigned_id_field),
    ("string_id_field", string_id_field),
    ("nullable_dates", nullable_dates),
    ("composite_key", composite_key),
    ("get_list_predicates", get_list_predicates),
    ("get_first", get_first),
    ("missing_key_affects_nothing", missing_key_affects_nothing),
    ("duplicate_key_is_constraint", duplicate_key_is_constraint),
    ("key_arity_mismatch", key_arity_mismatch),
    ("query_rows", query_rows),
];

/// Names of every check, in run order.
pub fn check_names() -> impl Iterator<Item = &'static str> {
    CHECKS.iter().map(|(name, _)| *name)
}

/// Run every check against `ctx`.
pub fn run_suite(ctx: &mut TestContext) -> SuiteReport {
    let mut report = SuiteReport::default();

    for &(name, check) in CHECKS {
        let start = Instant::now();
        let result = ctx.clear().map_err(CheckError::from).and_then(|()| check(ctx));
        let elapsed_us = start.elapsed().as_micros() as u64;

        let outcome = match result {
            Ok(()) => {
                info!(check = name, elapsed_us, "Check passed");
                CheckOutcome {
                    name,
                    passed: true,
                    detail: None,
                    elapsed_us,
                }
            }
            Err(err) => {
                warn!(check = name, error = %err, "Check failed");
                CheckOutcome {
                    name,
                    passed: false,
                    detail: Some(err.to_string()),
                    elapsed_us,
                }
            }
        };
        report.checks.push(outcome);
    }

    report
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> CheckResult {
    if condition {
        Ok(())
    } else {
        Err(CheckError::Assertion(message()))
    }
}

fn ensure_eq<T: PartialEq + Debug>(actual: T, expected: T, what: &str) -> CheckResult {
    ensure(actual == expected, || {
        format!("{what}: expected {expected:?}, got {actual:?}")
    })
}

fn expect_err<T: Debug>(
    result: MapperResult<T>,
    matches: impl FnOnce(&Error) -> bool,
    what: &str,
) -> CheckResult {
    match result {
        Err(err) if matches(&err) => Ok(()),
        Err(err) => Err(CheckError::Assertion(format!("{what}: unexpected error {err}"))),
        Ok(value) => Err(CheckError::Assertion(format!(
            "{what}: expected an error, got {value:?}"
        ))),
    }
}

fn all<T: Entity>(ctx: &mut TestContext) -> MapperResult<Vec<T>> {
    ctx.mapper.get_list(&mut ctx.conn, None, &[])?.collect()
}

fn identity_crud_round_trip(ctx: &mut TestContext) -> CheckResult {
    let mut user = User {
        name: "Adama".into(),
        age: 10,
        ..Default::default()
    };
    let key = ctx.mapper.insert(&mut ctx.conn, &mut user)?;
    ensure(user.id > 0, || format!("generated key not stored: {user:?}"))?;
    ensure_eq(key, Some(Value::Int32(user.id)), "returned key")?;

    let loaded: User = ctx.mapper.get(&mut ctx.conn, user.id)?;
    ensure_eq(&loaded, &user, "loaded user")?;

    user.name = "Bill".into();
    user.age = 11;
    ensure_eq(ctx.mapper.update(&mut ctx.conn, &user)?, 1, "updated rows")?;
    let loaded: User = ctx.mapper.get(&mut ctx.conn, user.id)?;
    ensure_eq(&loaded, &user, "updated user")?;

    ensure_eq(ctx.mapper.delete(&mut ctx.conn, &user)?, 1, "deleted rows")?;
    expect_err(
        ctx.mapper.get::<User, _>(&mut ctx.conn, user.id),
        |e| matches!(e, Error::NotFound { .. }),
        "get after delete",
    )
}

fn custom_identity_name(ctx: &mut TestContext) -> CheckResult {
    let created = NaiveDate::from_ymd_opt(2016, 4, 8)
        .and_then(|d| d.and_hms_opt(11, 30, 0))
        .ok_or_else(|| CheckError::Assertion("invalid fixture date".into()))?;

    let mut first = Stuff {
        name: "First".into(),
        created: Some(created),
        ..Default::default()
    };
    let mut second = Stuff {
        name: "Second".into(),
        ..Default::default()
    };
    ctx.mapper.insert(&mut ctx.conn, &mut first)?;
    ctx.mapper.insert(&mut ctx.conn, &mut second)?;
    ensure(second.the_id > first.the_id, || {
        format!("keys not increasing: {} then {}", first.the_id, second.the_id)
    })?;

    let loaded: Stuff = ctx.mapper.get(&mut ctx.conn, i32::from(first.the_id))?;
    ensure_eq(loaded.created, Some(created), "created")?;
    let loaded: Stuff = ctx.mapper.get(&mut ctx.conn, i32::from(second.the_id))?;
    ensure_eq(loaded.created, None, "unset created")
}

fn table_name_override(ctx: &mut TestContext) -> CheckResult {
    let mut car = Car {
        name: "Volvo".into(),
        ..Default::default()
    };
    ctx.mapper.insert(&mut ctx.conn, &mut car)?;
    let mut person = Person {
        name: "Ada".into(),
        ..Default::default()
    };
    ctx.mapper.insert(&mut ctx.conn, &mut person)?;

    ensure_eq(all::<Car>(ctx)?, vec![car], "cars")?;
    ensure_eq(all::<Person>(ctx)?, vec![person], "people")
}

fn reserved_word_column(ctx: &mut TestContext) -> CheckResult {
    let mut row = ResultRow {
        name: "Bob".into(),
        order: 1,
        ..Default::default()
    };
    ctx.mapper.insert(&mut ctx.conn, &mut row)?;
    row.order = 2;
    ctx.mapper.update(&mut ctx.conn, &row)?;

    let loaded: ResultRow = ctx.mapper.get(&mut ctx.conn, row.id)?;
    ensure_eq(loaded.order, 2, "order")
}

fn string_assigned_key(ctx: &mut TestContext) -> CheckResult {
    let mut x = ObjectX {
        object_x_id: "abc-123".into(),
        name: "Foo".into(),
    };
    ensure_eq(ctx.mapper.insert(&mut ctx.conn, &mut x)?, None, "insert key")?;

    x.name = "Bar".into();
    ensure_eq(ctx.mapper.update(&mut ctx.conn, &x)?, 1, "updated rows")?;
    let loaded: ObjectX = ctx.mapper.get(&mut ctx.conn, "abc-123")?;
    ensure_eq(&loaded, &x, "loaded")?;

    ensure_eq(ctx.mapper.delete(&mut ctx.conn, &x)?, 1, "deleted rows")
}

fn int_assigned_key(ctx: &mut TestContext) -> CheckResult {
    let mut y = ObjectY {
        object_y_id: 42,
        name: "Foo".into(),
    };
    ensure_eq(ctx.mapper.insert(&mut ctx.conn, &mut y)?, None, "insert key")?;
    ensure_eq(y.object_y_id, 42, "assigned key untouched")?;

    let loaded: ObjectY = ctx.mapper.get(&mut ctx.conn, 42i32)?;
    ensure_eq(&loaded, &y, "loaded")
}

fn assigned_id_field(ctx: &mut TestContext) -> CheckResult {
    let mut z = ObjectZ {
        id: 7,
        name: "Foo".into(),
    };
    ctx.mapper.insert(&mut ctx.conn, &mut z)?;
    let loaded: ObjectZ = ctx.mapper.get(&mut ctx.conn, 7i32)?;
    ensure_eq(&loaded, &z, "loaded")
}

fn string_id_field(ctx: &mut TestContext) -> CheckResult {
    let mut generic = GenericType {
        id: "id-1".into(),
        name: "Foo".into(),
    };
    ctx.mapper.insert(&mut ctx.conn, &mut generic)?;
    generic.name = "Bar".into();
    ctx.mapper.update(&mut ctx.conn, &generic)?;

    let loaded: GenericType = ctx.mapper.get(&mut ctx.conn, "id-1")?;
    ensure_eq(&loaded, &generic, "loaded")?;
    ensure_eq(
        ctx.mapper.delete_by_key::<GenericType, _>(&mut ctx.conn, "id-1")?,
        1,
        "deleted rows",
    )
}

fn nullable_dates(ctx: &mut TestContext) -> CheckResult {
    let when = NaiveDate::from_ymd_opt(2011, 7, 14)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| CheckError::Assertion("invalid fixture date".into()))?;

    let mut with_date = NullableDate {
        date_value: Some(when),
        ..Default::default()
    };
    let mut without = NullableDate::default();
    ctx.mapper.insert(&mut ctx.conn, &mut with_date)?;
    ctx.mapper.insert(&mut ctx.conn, &mut without)?;

    let loaded: NullableDate = ctx.mapper.get(&mut ctx.conn, with_date.id)?;
    ensure_eq(loaded.date_value, Some(when), "set date")?;
    let loaded: NullableDate = ctx.mapper.get(&mut ctx.conn, without.id)?;
    ensure_eq(loaded.date_value, None, "null date")
}

fn composite_key(ctx: &mut TestContext) -> CheckResult {
    let mut owner = Membership {
        group_id: 1,
        user_id: 1,
        role: "owner".into(),
    };
    let mut member = Membership {
        group_id: 1,
        user_id: 2,
        role: "member".into(),
    };
    ctx.mapper.insert(&mut ctx.conn, &mut owner)?;
    ctx.mapper.insert(&mut ctx.conn, &mut member)?;

    member.role = "admin".into();
    ensure_eq(ctx.mapper.update(&mut ctx.conn, &member)?, 1, "updated rows")?;

    let loaded: Membership = ctx.mapper.get(&mut ctx.conn, (1i32, 2i32))?;
    ensure_eq(loaded.role.as_str(), "admin", "role")?;
    let loaded: Membership = ctx.mapper.get(&mut ctx.conn, (1i32, 1i32))?;
    ensure_eq(loaded.role.as_str(), "owner", "untouched role")?;

    ensure_eq(ctx.mapper.delete(&mut ctx.conn, &owner)?, 1, "deleted rows")?;
    ensure_eq(all::<Membership>(ctx)?.len(), 1, "remaining")
}

fn seed_users(ctx: &mut TestContext) -> MapperResult<()> {
    for (name, age) in [("Ann", 20), ("Ben", 30), ("Cy", 40)] {
        let mut user = User {
            name: name.into(),
            age,
            ..Default::default()
        };
        ctx.mapper.insert(&mut ctx.conn, &mut user)?;
    }
    Ok(())
}

fn get_list_predicates(ctx: &mut TestContext) -> CheckResult {
    seed_users(ctx)?;
    ensure_eq(all::<User>(ctx)?.len(), 3, "all users")?;

    let mut older: Vec<User> = ctx
        .mapper
        .get_list(&mut ctx.conn, Some("Age >= @Age"), &[("Age", Value::Int32(30))])?
        .collect::<MapperResult<_>>()?;
    older.sort_by_key(|u| u.age);
    let names: Vec<&str> = older.iter().map(|u| u.name.as_str()).collect();
    ensure_eq(names, vec!["Ben", "Cy"], "filtered users")?;

    let named: Vec<User> = ctx
        .mapper
        .get_list(
            &mut ctx.conn,
            Some("select * from Users where Name = @Name"),
            &[("Name", Value::from("Cy"))],
        )?
        .collect::<MapperResult<_>>()?;
    ensure_eq(named.len(), 1, "full select")?;

    let count = ctx
        .mapper
        .count::<User, _>(&mut ctx.conn, Some("Age < @Age"), &[("Age", Value::Int32(35))])?;
    ensure_eq(count, 2, "count")
}

fn get_first(ctx: &mut TestContext) -> CheckResult {
    seed_users(ctx)?;
    let first: Option<User> = ctx.mapper.get_first(
        &mut ctx.conn,
        Some("Name = @Name"),
        &[("Name", Value::from("Ben"))],
    )?;
    ensure_eq(first.map(|u| u.age), Some(30), "first match")?;

    let none: Option<User> = ctx.mapper.get_first(&mut ctx.conn, Some("Age > 100"), &[])?;
    ensure(none.is_none(), || "expected no match".into())
}

fn missing_key_affects_nothing(ctx: &mut TestContext) -> CheckResult {
    let ghost = User {
        id: 999,
        name: "Ghost".into(),
        age: 1,
    };
    ensure_eq(ctx.mapper.update(&mut ctx.conn, &ghost)?, 0, "updated rows")?;
    ensure_eq(ctx.mapper.delete(&mut ctx.conn, &ghost)?, 0, "deleted rows")?;
    expect_err(
        ctx.mapper.get::<User, _>(&mut ctx.conn, 999i32),
        Error::is_lookup_miss,
        "get missing",
    )
}

fn duplicate_key_is_constraint(ctx: &mut TestContext) -> CheckResult {
    let mut x = ObjectX {
        object_x_id: "dup".into(),
        name: "First".into(),
    };
    ctx.mapper.insert(&mut ctx.conn, &mut x)?;
    expect_err(
        ctx.mapper.insert(&mut ctx.conn, &mut x.clone()),
        |e| matches!(e, Error::ConstraintViolation(_)),
        "duplicate insert",
    )
}

fn key_arity_mismatch(ctx: &mut TestContext) -> CheckResult {
    expect_err(
        ctx.mapper.get::<Membership, _>(&mut ctx.conn, 1i32),
        |e| matches!(e, Error::InvalidKey { .. }),
        "single value for composite key",
    )?;
    expect_err(
        ctx.mapper
            .get::<User, _>(&mut ctx.conn, Key::new(vec![Value::Int32(1), Value::Int32(2)])),
        |e| matches!(e, Error::InvalidKey { .. }),
        "two values for single key",
    )?;
    expect_err(
        ctx.mapper.get::<User, _>(&mut ctx.conn, Value::Null),
        |e| matches!(e, Error::InvalidKey { .. }),
        "null key",
    )
}

fn query_rows(ctx: &mut TestContext) -> CheckResult {
    seed_users(ctx)?;
    let rows = ctx.mapper.query_rows(
        &mut ctx.conn,
        "SELECT Name, Age FROM Users WHERE Age > @Age ORDER BY Age",
        &[("Age", Value::Int32(25))],
    )?;
    ensure_eq(rows.len(), 2, "rows")?;
    ensure_eq(rows[0].get::<String>("name")?, "Ben".to_string(), "first row")?;
    ensure_eq(rows[1].get::<i32>("AGE")?, 40, "second row")
}
