//! CResult: the success/failure contract between fetch, handle, and output
//! layers. Exactly one of the two shapes; JSON output is always one object.

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone, Debug)]
pub enum CResult<T> {
    Ok {
        data: T,
    },
    Err {
        message: String,
        cause: Option<String>,
        code: Option<u16>,
    },
}

impl<T> CResult<T> {
    pub fn ok(data: T) -> Self {
        CResult::Ok { data }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        CResult::Err {
            message: message.into(),
            cause: None,
            code: None,
        }
    }

    pub fn fail_with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        CResult::Err {
            message: message.into(),
            cause: Some(cause.into()),
            code: None,
        }
    }

    pub fn fail_with_code(message: impl Into<String>, code: u16) -> Self {
        CResult::Err {
            message: message.into(),
            cause: None,
            code: Some(code),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CResult::Ok { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CResult<U> {
        match self {
            CResult::Ok { data } => CResult::Ok { data: f(data) },
            CResult::Err {
                message,
                cause,
                code,
            } => CResult::Err {
                message,
                cause,
                code,
            },
        }
    }

    /// Exit code for the process: 0 on success, 1 on failure.
    /// Usage errors (exit 2) never reach a CResult; they are caught at parse time.
    pub fn exit_code(&self) -> i32 {
        if self.is_ok() {
            0
        } else {
            1
        }
    }

    /// Collapse into a plain Result, folding the cause into the message.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            CResult::Ok { data } => Ok(data),
            CResult::Err { message, cause, .. } => match cause {
                Some(cause) => Err(format!("{} ({})", message, cause)),
                None => Err(message),
            },
        }
    }
}

impl<T: Serialize> CResult<T> {
    /// The JSON output contract: {"success":true,"result":...} or
    /// {"success":false,"message":...,"cause":...}.
    pub fn to_json(&self) -> Value {
        match self {
            CResult::Ok { data } => json!({
                "success": true,
                "result": data,
            }),
            CResult::Err {
                message,
                cause,
                code,
            } => {
                let mut obj = json!({
                    "success": false,
                    "message": message,
                });
                if let Some(cause) = cause {
                    obj["cause"] = json!(cause);
                }
                if let Some(code) = code {
                    obj["code"] = json!(code);
                }
                obj
            }
        }
    }
}

impl<T> From<Result<T, String>> for CResult<T> {
    fn from(r: Result<T, String>) -> Self {
        match r {
            Ok(data) => CResult::ok(data),
            Err(e) => CResult::fail(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_serializes_to_success_result() {
        let r = CResult::ok(json!({"key": "apiProxy", "value": "https://example.com"}));
        let v = r.to_json();
        assert_eq!(v["success"], json!(true));
        assert_eq!(v["result"]["key"], json!("apiProxy"));
        assert!(v.get("message").is_none());
    }

    #[test]
    fn err_serializes_message_and_cause() {
        let r: CResult<Value> = CResult::fail_with_cause("Fetch failed", "HTTP 500");
        let v = r.to_json();
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["message"], json!("Fetch failed"));
        assert_eq!(v["cause"], json!("HTTP 500"));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(CResult::ok(1).exit_code(), 0);
        assert_eq!(CResult::<i32>::fail("boom").exit_code(), 1);
    }
}
