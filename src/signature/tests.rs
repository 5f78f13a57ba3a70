use crate::ty::{Ty, TypeCode};

use super::{parse_many, parse_one, Signature, SignatureErrorKind};

use SignatureErrorKind::*;

macro_rules! test {
    ($input:expr, $expected:pat) => {{
        let actual = parse_one($input).map_err(|e| e.kind);

        assert!(
            matches!(actual, $expected),
            "{actual:?} does not match {}",
            stringify!($expected)
        );
    }};
}

fn prim(code: TypeCode) -> Ty {
    Ty::Primitive(code)
}

#[test]
fn single_types() {
    assert_eq!(parse_one("y"), Ok(prim(TypeCode::Byte)));

    let mut ty = prim(TypeCode::Byte);

    for _ in 0..6 {
        ty = Ty::Array(Box::new(ty));
    }

    assert_eq!(parse_one("aaaaaay"), Ok(ty));

    assert_eq!(
        parse_one("a(ybnqiuxt)"),
        Ok(Ty::Array(Box::new(Ty::Struct(vec![
            prim(TypeCode::Byte),
            prim(TypeCode::Boolean),
            prim(TypeCode::Int16),
            prim(TypeCode::UInt16),
            prim(TypeCode::Int32),
            prim(TypeCode::UInt32),
            prim(TypeCode::Int64),
            prim(TypeCode::UInt64),
        ]))))
    );

    assert_eq!(
        parse_one("(y(b(ss)b)y)"),
        Ok(Ty::Struct(vec![
            prim(TypeCode::Byte),
            Ty::Struct(vec![
                prim(TypeCode::Boolean),
                Ty::Struct(vec![prim(TypeCode::String), prim(TypeCode::String)]),
                prim(TypeCode::Boolean),
            ]),
            prim(TypeCode::Byte),
        ]))
    );

    assert_eq!(
        parse_one("a{sv}"),
        Ok(Ty::Array(Box::new(Ty::DictEntry(
            Box::new(prim(TypeCode::String)),
            Box::new(Ty::Variant),
        ))))
    );
}

#[test]
fn parse_errors() {
    test!("", Err(Empty));
    test!("a", Err(Empty));
    test!("az", Err(UnknownType('z')));
    test!("w", Err(UnknownType('w')));
    test!(" ", Err(UnknownType(' ')));
    test!("ayy", Err(TrailingCharacters(..)));
    test!("{", Err(DictEntryOutsideArray));
    test!("{sv}", Err(DictEntryOutsideArray));
    test!("a{sss}", Err(DictEntryArity(3)));
    test!("a{s}", Err(DictEntryArity(1)));
    test!("a{}", Err(DictEntryArity(0)));
    test!("a{(ii)i}", Err(NonBasicDictKey(..)));
    test!("a{vs}", Err(NonBasicDictKey(..)));
    test!("(", Err(UnexpectedEnd(')')));
    test!("(iiii", Err(UnexpectedEnd(')')));
    test!("a{si", Err(UnexpectedEnd('}')));
    test!("()", Err(EmptyStruct));
    test!(")", Err(UnknownType(')')));
}

#[test]
fn error_messages() {
    let err = |s: &str| parse_one(s).map(|_| ()).map_err(|e| e.to_string());

    assert_eq!(err(""), Err("empty signature".to_string()));
    assert_eq!(err("az"), Err("unknown type 'z'".to_string()));
    assert_eq!(
        err("{"),
        Err("unknown type '{' (did you mean 'a{'?)".to_string())
    );
    assert_eq!(
        err("a{sss}"),
        Err("expected 2 signatures in dictionary, got 3".to_string())
    );
    assert_eq!(
        err("ayy"),
        Err("unexpected trailing characters 'y'".to_string())
    );
    assert_eq!(
        err("(i"),
        Err("unexpected end of signature, expected ')'".to_string())
    );
}

#[test]
fn nesting_limits() {
    let deep_array = |n: usize| format!("{}y", "a".repeat(n));
    assert!(parse_one(&deep_array(32)).is_ok());
    test!(&deep_array(33), Err(ArrayDepth));

    let deep_struct = |n: usize| format!("{}y{}", "(".repeat(n), ")".repeat(n));
    assert!(parse_one(&deep_struct(32)).is_ok());
    test!(&deep_struct(33), Err(StructDepth));
}

#[test]
fn length_limit() {
    let long = "y".repeat(255);
    assert!(parse_many(&long).is_ok());

    let too_long = "y".repeat(256);
    assert_eq!(
        parse_many(&too_long).map_err(|e| e.kind),
        Err(TooLong(256))
    );
}

#[test]
fn many_types() {
    assert_eq!(parse_many(""), Ok(vec![]));

    assert_eq!(
        parse_many("ayy"),
        Ok(vec![
            Ty::Array(Box::new(prim(TypeCode::Byte))),
            prim(TypeCode::Byte),
        ])
    );

    let types = parse_many("susssasa{sv}i").expect("parses");
    assert_eq!(types.len(), 8);
}

#[test]
fn descriptor_display() {
    for sig in ["y", "a{sv}", "a(ybnqiuxt)", "(y(b(ss)b)y)", "aaaaaay", "av"] {
        let ty = parse_one(sig).expect("parses");
        assert_eq!(ty.to_string(), sig);
    }
}

#[test]
fn signature_type() {
    let sig = Signature::new("a{sv}").expect("valid");
    assert_eq!(sig, "a{sv}");
    assert!(!sig.is_empty());

    assert!(Signature::new("").expect("valid").is_empty());
    assert!(Signature::new("a{sss}").is_err());
}
