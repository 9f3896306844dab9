//! rpc - протокол поверх TCP: одна JSON-строка на запрос и одна на ответ.
//!
//! Запрос:  `{"method":"Append","params":{"list_id":1,"value":10}}`
//! Ответ:   `{"ok":true,"result":{...}}` |
//!          `{"ok":false,"error":{"kind":"NotFound","message":"..."}}`
//!
//! Подмодули:
//! - server.rs - tokio-сервер: задача на соединение, периодический снапшот, сигналы.
//! - client.rs - блокирующий клиент (CLI, тесты).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, ListError};
use crate::metrics::{record_rpc_call, record_rpc_error, RpcVerb};
use crate::service::RemoteList;
use crate::store::ListsMap;

pub mod client;
pub mod server;

pub use client::{RpcClient, RpcError};
pub use server::{run_server, serve_with_shutdown, BackgroundServer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Request {
    Append { list_id: i64, value: i64 },
    Get { list_id: i64, index: i64 },
    Remove { list_id: i64 },
    Size { list_id: i64 },
    GetAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendReply {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueReply {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeReply {
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAllReply {
    pub lists: ListsMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl Response {
    pub fn success<T: Serialize>(reply: &T) -> Self {
        match serde_json::to_value(reply) {
            Ok(v) => Self {
                ok: true,
                result: Some(v),
                error: None,
            },
            Err(e) => Self::failure(ErrorKind::Decode, format!("encode reply: {}", e)),
        }
    }

    pub fn failure(kind: ErrorKind, message: String) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(WireError { kind, message }),
        }
    }

    pub fn bad_request(message: String) -> Self {
        Self::failure(ErrorKind::BadRequest, message)
    }
}

impl From<&ListError> for Response {
    fn from(e: &ListError) -> Self {
        Response::failure(e.kind(), e.to_string())
    }
}

/// Выполнить один запрос над фасадом (блокирующий вызов).
pub fn dispatch(rl: &RemoteList, req: Request) -> Response {
    let res = match req {
        Request::Append { list_id, value } => {
            record_rpc_call(RpcVerb::Append);
            rl.append(list_id, value)
                .map(|()| Response::success(&AppendReply { ok: true }))
        }
        Request::Get { list_id, index } => {
            record_rpc_call(RpcVerb::Get);
            rl.get(list_id, index)
                .map(|value| Response::success(&ValueReply { value }))
        }
        Request::Remove { list_id } => {
            record_rpc_call(RpcVerb::Remove);
            rl.remove(list_id)
                .map(|value| Response::success(&ValueReply { value }))
        }
        Request::Size { list_id } => {
            record_rpc_call(RpcVerb::Size);
            rl.size(list_id)
                .map(|size| Response::success(&SizeReply { size }))
        }
        Request::GetAll => {
            record_rpc_call(RpcVerb::GetAll);
            Ok(Response::success(&GetAllReply {
                lists: rl.get_all(),
            }))
        }
    };
    res.unwrap_or_else(|e| {
        record_rpc_error();
        Response::from(&e)
    })
}
