//! Objects hosted by `simplerpc serve`.

use std::thread;
use std::time::Duration;

use simplerpc_channel::{DispatchError, InvocationResult, ServiceError, ServiceTable, TypedValue};

pub const CALC: &str = "Calc";
pub const ECHO: &str = "Echo";

/// Longest sleep `Calc.Sleep` will honor.
const MAX_SLEEP_MS: i32 = 60_000;

pub fn services() -> ServiceTable {
    ServiceTable::new().with_object(CALC, calc).with_object(ECHO, echo)
}

fn calc(method: &str, args: &[TypedValue]) -> Result<InvocationResult, DispatchError> {
    match method {
        "Add" => {
            let (a, b) = (int_arg(method, args, 0)?, int_arg(method, args, 1)?);
            let sum = a.checked_add(b).ok_or_else(|| invalid(method, "overflow"))?;
            Ok(InvocationResult::returning(sum))
        }
        "Sub" => {
            let (a, b) = (int_arg(method, args, 0)?, int_arg(method, args, 1)?);
            let diff = a.checked_sub(b).ok_or_else(|| invalid(method, "overflow"))?;
            Ok(InvocationResult::returning(diff))
        }
        "Div" => {
            let (a, b) = (int_arg(method, args, 0)?, int_arg(method, args, 1)?);
            if b == 0 {
                return Err(invalid(method, "division by zero"));
            }
            let quotient = a.checked_div(b).ok_or_else(|| invalid(method, "overflow"))?;
            Ok(InvocationResult::Return {
                return_value: TypedValue::Int32(quotient),
                out_arguments: vec![TypedValue::Int32(a.wrapping_rem(b))],
            })
        }
        "Fail" => {
            let message = args
                .first()
                .and_then(TypedValue::as_str)
                .unwrap_or("boom")
                .to_string();
            Err(message.into())
        }
        "Sleep" => {
            let ms = int_arg(method, args, 0)?.clamp(0, MAX_SLEEP_MS);
            thread::sleep(Duration::from_millis(ms as u64));
            Ok(InvocationResult::returning(TypedValue::Null))
        }
        other => Err(ServiceError::UnknownMethod {
            object: CALC.to_string(),
            method: other.to_string(),
        }
        .into()),
    }
}

fn echo(method: &str, args: &[TypedValue]) -> Result<InvocationResult, DispatchError> {
    match method {
        "Echo" => Ok(InvocationResult::Return {
            return_value: args.first().cloned().unwrap_or(TypedValue::Null),
            out_arguments: args.iter().skip(1).cloned().collect(),
        }),
        "Upper" => {
            let text = args
                .first()
                .and_then(TypedValue::as_str)
                .ok_or_else(|| invalid(method, "argument 0 must be a string"))?;
            Ok(InvocationResult::returning(text.to_uppercase()))
        }
        other => Err(ServiceError::UnknownMethod {
            object: ECHO.to_string(),
            method: other.to_string(),
        }
        .into()),
    }
}

fn int_arg(method: &str, args: &[TypedValue], index: usize) -> Result<i32, DispatchError> {
    args.get(index)
        .and_then(TypedValue::as_i32)
        .ok_or_else(|| invalid(method, &format!("argument {index} must be int32")))
}

fn invalid(method: &str, message: &str) -> DispatchError {
    ServiceError::InvalidArguments {
        method: method.to_string(),
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use simplerpc_channel::{Dispatcher, Registry};

    use super::*;

    fn invoke(
        object: &str,
        method: &str,
        args: Vec<TypedValue>,
    ) -> Result<InvocationResult, String> {
        let table = services();
        let target = table.resolve(object).expect("demo object should be registered");
        table.invoke(&target, method, args).map_err(|err| err.to_string())
    }

    #[test]
    fn calc_arithmetic() {
        assert_eq!(
            invoke(CALC, "Add", vec![2.into(), 3.into()]),
            Ok(InvocationResult::returning(5))
        );
        assert_eq!(
            invoke(CALC, "Sub", vec![2.into(), 3.into()]),
            Ok(InvocationResult::returning(-1))
        );
        assert_eq!(
            invoke(CALC, "Div", vec![7.into(), 2.into()]),
            Ok(InvocationResult::Return {
                return_value: TypedValue::Int32(3),
                out_arguments: vec![TypedValue::Int32(1)],
            })
        );
    }

    #[test]
    fn calc_reports_bad_input() {
        assert_eq!(
            invoke(CALC, "Add", vec![i32::MAX.into(), 1.into()]),
            Err("Add: overflow".to_string())
        );
        assert_eq!(
            invoke(CALC, "Div", vec![1.into(), 0.into()]),
            Err("Div: division by zero".to_string())
        );
        assert_eq!(
            invoke(CALC, "Add", vec!["x".into()]),
            Err("Add: argument 0 must be int32".to_string())
        );
        assert_eq!(invoke(CALC, "Fail", vec![]), Err("boom".to_string()));
        assert_eq!(
            invoke(CALC, "Nope", vec![]),
            Err("method Nope not found on Calc".to_string())
        );
    }

    #[test]
    fn echo_returns_arguments() {
        assert_eq!(
            invoke(ECHO, "Echo", vec!["a".into(), true.into()]),
            Ok(InvocationResult::Return {
                return_value: TypedValue::from("a"),
                out_arguments: vec![TypedValue::Bool(true)],
            })
        );
        assert_eq!(
            invoke(ECHO, "Upper", vec!["abc".into()]),
            Ok(InvocationResult::returning("ABC"))
        );
    }
}
