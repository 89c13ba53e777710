//! The concrete end-to-end scenarios: each a full parser built from the
//! public API and run against a fixed input with a fixed expected outcome.

use parsley_core::prelude::*;
use parsley_core::parse;

fn digit() -> impl Parser<str, char> + Clone {
    primitive::satisfy::<str, _>(|c: &char| c.is_ascii_digit(), Some("digit"))
}

#[test]
fn digits_collected_by_many() {
    let p = digit().repeated();
    assert_eq!(parse(&p, "123"), Ok(vec!['1', '2', '3']));
}

#[test]
fn string_mismatch_consumes_unless_atomic() {
    let p = string::<str>("abc");
    let mut rt = parsley_core::runtime::Runtime::new("ab");
    match p.run(&mut rt) {
        Ok(parsley_core::runtime::Signal::Bad { consumed, error }) => {
            assert!(consumed);
            assert_eq!(error.position().column, 3);
        }
        _ => panic!("expected a consuming failure"),
    }

    let atomic_p = string::<str>("abc").atomic();
    let mut rt2 = parsley_core::runtime::Runtime::new("ab");
    match atomic_p.run(&mut rt2) {
        Ok(parsley_core::runtime::Signal::Bad { consumed, error }) => {
            assert!(!consumed);
            assert_eq!(error.position().column, 1);
        }
        _ => panic!("expected a non-consuming failure"),
    }
}

#[test]
fn sep_by_digits_separated_by_comma_space() {
    let p = iter::sep_by(digit(), string::<str>(", "));
    assert_eq!(parse(&p, "7, 3, 2"), Ok(vec!['7', '3', '2']));
    assert_eq!(parse(&iter::sep_by(digit(), string::<str>(", ")), ""), Ok(vec![]));
    assert!(parse(&iter::sep_by(digit(), string::<str>(", ")), "1, 2, ").is_err());
}

#[test]
fn many_until_consumes_through_the_terminator() {
    let p = primitive::item::<str>().many_until(string::<str>("*/"));
    assert_eq!(parse(&p, "hello*/"), Ok(vec!['h', 'e', 'l', 'l', 'o']));
}

#[test]
fn register_driven_a_n_b_n_c_n() {
    let count: register::Register<i32> = register::Register::new();

    let build = || {
        register::put_value(count, 0)
            .ignore_then(
                string::<str>("a")
                    .ignore_then(register::modify(count, |n| n + 1))
                    .repeated(),
            )
            .ignore_then(register::for_p::<str, i32, char, _, _, _, _, _, _, _>(
                register::get(count),
                primitive::pure(|n: i32| n != 0),
                primitive::pure(|n: i32| n - 1),
                |_n: i32| string::<str>("b").map(|s| s.chars().next().unwrap()),
            ))
            .ignore_then(register::for_p::<str, i32, char, _, _, _, _, _, _, _>(
                register::get(count),
                primitive::pure(|n: i32| n != 0),
                primitive::pure(|n: i32| n - 1),
                |_n: i32| string::<str>("c").map(|s| s.chars().next().unwrap()),
            ))
    };

    assert!(parse(&build().then_ignore(primitive::eof::<str>()), "aaabbbccc").is_ok());
    assert!(parse(&build(), "aaabbcc").is_err());
}

#[test]
fn look_ahead_yields_without_advancing() {
    let p = string::<str>("abc").look_ahead();
    let mut rt = parsley_core::runtime::Runtime::new("abcdef");
    match p.run(&mut rt) {
        Ok(parsley_core::runtime::Signal::Good(v)) => {
            assert_eq!(v, "abc");
            assert_eq!(rt.cursor().offset(), 0);
        }
        _ => panic!("expected success"),
    }
}
