//! Algebraic laws that must hold for every grammar, not just the examples
//! exercised by the unit tests alongside each combinator.

use parsley_core::prelude::*;
use parsley_core::parse;
use proptest::prelude::*;

fn digit() -> impl Parser<str, char> + Clone {
    primitive::satisfy::<str, _>(|c: &char| c.is_ascii_digit(), Some("digit"))
}

proptest! {
    #[test]
    fn pure_map_equals_pure_of_applied(x in any::<i32>()) {
        let mapped = primitive::pure::<str, _>(x).map(|v| v + 1);
        let direct = primitive::pure::<str, _>(x + 1);
        prop_assert_eq!(parse(&mapped, "").ok(), parse(&direct, "").ok());
    }

    #[test]
    fn seq_pure_is_left_identity(s in "[a-z]{0,5}") {
        let via_pure = primitive::pure::<str, _>(()).then(digit().repeated()).map(|(_, v)| v);
        let direct = digit().repeated();
        prop_assert_eq!(parse(&via_pure, &s).ok(), parse(&direct, &s).ok());
    }

    #[test]
    fn alt_empty_is_identity(s in "[a-z0-9]{0,5}") {
        let left = primitive::empty::<str, char>().or(digit());
        let right = digit().or(primitive::empty::<str, char>());
        prop_assert_eq!(parse(&left, &s).is_ok(), parse(&digit(), &s).is_ok());
        prop_assert_eq!(parse(&right, &s).is_ok(), parse(&digit(), &s).is_ok());
    }

    #[test]
    fn alt_is_associative(s in "[a-z0-9]{0,5}") {
        let a = primitive::satisfy::<str, _>(|c: &char| *c == 'a', Some("a"));
        let b = primitive::satisfy::<str, _>(|c: &char| *c == 'b', Some("b"));
        let c = primitive::satisfy::<str, _>(|c: &char| *c == 'c', Some("c"));
        let left_assoc = a.clone().or(b.clone()).or(c.clone());
        let right_assoc = a.or(b.or(c));
        prop_assert_eq!(parse(&left_assoc, &s).ok(), parse(&right_assoc, &s).ok());
    }

    #[test]
    fn atomic_is_idempotent_over_random_input(s in "[a-z]{0,6}") {
        let needle = string::<str>("abc");
        let once = needle.atomic();
        let twice = string::<str>("abc").atomic().atomic();
        prop_assert_eq!(parse(&once, &s).ok(), parse(&twice, &s).ok());
    }

    #[test]
    fn look_ahead_never_advances_the_cursor(s in "[a-z]{1,6}") {
        let mut rt = parsley_core::runtime::Runtime::new(s.as_str());
        let p = digit().or(primitive::item::<str>()).look_ahead();
        let before = rt.cursor();
        let _ = p.run(&mut rt);
        prop_assert_eq!(rt.cursor(), before);
    }

    #[test]
    fn consuming_failure_blocks_the_right_alternative(s in "[a-z]{2,6}") {
        // string("aa") only fails consuming if the input starts with 'a'
        // but mismatches at the second character.
        prop_assume!(s.starts_with('a') && !s.starts_with("aa"));
        let p = string::<str>("aa").map(|_| 'z').or(primitive::item::<str>());
        prop_assert!(parse(&p, &s).is_err());
    }

    #[test]
    fn non_consuming_failure_falls_through_to_the_right_alternative(s in "[b-z]{0,6}") {
        let p = primitive::satisfy::<str, _>(|c: &char| *c == 'a', Some("a")).or(primitive::item::<str>());
        let direct = primitive::item::<str>();
        prop_assert_eq!(parse(&p, &s).ok(), parse(&direct, &s).ok());
    }
}

#[test]
fn put_then_get_returns_the_written_value() {
    let reg: register::Register<i32> = register::Register::new();
    let p = register::put_value(reg, 3).ignore_then(register::get(reg));
    assert_eq!(parse(&p, ""), Ok(3));
}

#[test]
fn put_then_put_keeps_only_the_last_value() {
    let reg: register::Register<i32> = register::Register::new();
    let p = register::put_value(reg, 1)
        .ignore_then(register::put_value(reg, 2))
        .ignore_then(register::get(reg));
    assert_eq!(parse(&p, ""), Ok(2));
}

#[test]
fn local_returns_the_new_value_during_the_body() {
    let reg: register::Register<i32> = register::Register::new();
    let p = register::put_value(reg, 1).ignore_then(register::local_value(reg, 9, register::get(reg)));
    assert_eq!(parse(&p, ""), Ok(9));
}
