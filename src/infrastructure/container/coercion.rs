//! 用户参数的标量转换
//!
//! 没有用户参数与声明类型完全一致时，基本类型或文本参数仍可接受能够无损
//! 转换的值：整数、浮点数、`bool`、`char` 与 `String` 在取值合适时互相转换。
//! 浮点数转整数时四舍六入五成双。放不下的值返回 `None`，参数扫描继续向后。

use super::recipe::Param;
use std::any::{Any, TypeId};

enum Scalar {
    Int(i128),
    Float(f64),
    Bool(bool),
    Char(char),
    Text(String),
}

macro_rules! read_ints {
    ($value:expr, $($t:ty),*) => {
        $(
            if let Some(v) = $value.downcast_ref::<$t>() {
                return i128::try_from(*v).ok().map(Scalar::Int);
            }
        )*
    };
}

fn read(value: &(dyn Any + Send + Sync)) -> Option<Scalar> {
    read_ints!(value, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
    if let Some(v) = value.downcast_ref::<f32>() {
        return Some(Scalar::Float(f64::from(*v)));
    }
    if let Some(v) = value.downcast_ref::<f64>() {
        return Some(Scalar::Float(*v));
    }
    if let Some(v) = value.downcast_ref::<bool>() {
        return Some(Scalar::Bool(*v));
    }
    if let Some(v) = value.downcast_ref::<char>() {
        return Some(Scalar::Char(*v));
    }
    if let Some(v) = value.downcast_ref::<String>() {
        return Some(Scalar::Text(v.clone()));
    }
    if let Some(v) = value.downcast_ref::<&'static str>() {
        return Some(Scalar::Text((*v).to_string()));
    }
    None
}

fn float_to_int(value: f64) -> Option<i128> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round_ties_even();
    if rounded < i128::MIN as f64 || rounded >= i128::MAX as f64 {
        return None;
    }
    Some(rounded as i128)
}

macro_rules! to_int {
    ($scalar:expr, $t:ty) => {{
        let converted: Option<$t> = match $scalar {
            Scalar::Int(i) => <$t>::try_from(i).ok(),
            Scalar::Float(f) => float_to_int(f).and_then(|i| <$t>::try_from(i).ok()),
            Scalar::Bool(b) => Some(if b { 1 } else { 0 }),
            Scalar::Char(c) => <$t>::try_from(c as u32).ok(),
            Scalar::Text(s) => s.trim().parse::<$t>().ok(),
        };
        converted.map(|v| Box::new(v) as Param)
    }};
}

macro_rules! to_float {
    ($scalar:expr, $t:ty) => {{
        let converted: Option<$t> = match $scalar {
            Scalar::Int(i) => Some(i as $t),
            Scalar::Float(f) => Some(f as $t),
            Scalar::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            Scalar::Char(_) => None,
            Scalar::Text(s) => s.trim().parse::<$t>().ok(),
        };
        converted.map(|v| Box::new(v) as Param)
    }};
}

macro_rules! dispatch_ints {
    ($target:expr, $scalar:expr, $($t:ty),*) => {
        $(
            if $target == TypeId::of::<$t>() {
                return to_int!($scalar, $t);
            }
        )*
    };
}

fn to_bool(scalar: Scalar) -> Option<bool> {
    match scalar {
        Scalar::Int(i) => Some(i != 0),
        Scalar::Float(f) => Some(f != 0.0),
        Scalar::Bool(b) => Some(b),
        Scalar::Char(_) => None,
        Scalar::Text(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Some(true)
            } else if s.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
    }
}

fn to_char(scalar: Scalar) -> Option<char> {
    match scalar {
        Scalar::Int(i) => u32::try_from(i).ok().and_then(char::from_u32),
        Scalar::Char(c) => Some(c),
        Scalar::Text(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
        Scalar::Float(_) | Scalar::Bool(_) => None,
    }
}

fn to_text(scalar: Scalar) -> String {
    match scalar {
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Char(c) => c.to_string(),
        Scalar::Text(s) => s,
    }
}

/// `target` 类型的值能否由 [`coerce`] 产生
pub(crate) fn is_scalar(target: TypeId) -> bool {
    [
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<i128>(),
        TypeId::of::<isize>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<u128>(),
        TypeId::of::<usize>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<String>(),
    ]
    .contains(&target)
}

/// 把 `value` 转换为 `target` 类型的新参数
pub(crate) fn coerce(value: &(dyn Any + Send + Sync), target: TypeId) -> Option<Param> {
    let scalar = read(value)?;

    dispatch_ints!(target, scalar, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

    if target == TypeId::of::<f32>() {
        return to_float!(scalar, f32);
    }
    if target == TypeId::of::<f64>() {
        return to_float!(scalar, f64);
    }
    if target == TypeId::of::<bool>() {
        return to_bool(scalar).map(|v| Box::new(v) as Param);
    }
    if target == TypeId::of::<char>() {
        return to_char(scalar).map(|v| Box::new(v) as Param);
    }
    if target == TypeId::of::<String>() {
        return Some(Box::new(to_text(scalar)));
    }
    None
}
