//! rpc/client - блокирующий клиент (std::net), одна строка запроса -> одна строка ответа.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};

use serde::de::DeserializeOwned;

use super::{AppendReply, GetAllReply, Request, Response, SizeReply, ValueReply};
use crate::error::ErrorKind;
use crate::store::ListsMap;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Сервер выполнил вызов и вернул ошибку.
    #[error("{kind}: {message}")]
    Remote { kind: ErrorKind, message: String },

    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),

    #[error("protocol: {0}")]
    Protocol(String),
}

impl RpcError {
    /// Вид удалённой ошибки; None для транспортных/протокольных.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RpcError::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub struct RpcClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl RpcClient {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, RpcError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true).ok();
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Низкоуровневый вызов: отправить запрос, прочитать ответ как есть.
    pub fn call(&mut self, req: &Request) -> Result<Response, RpcError> {
        let mut line = serde_json::to_vec(req).map_err(|e| RpcError::Protocol(e.to_string()))?;
        line.push(b'\n');
        self.call_raw(&line)
    }

    /// Отправить готовую строку (включая '\n'). Нужен для проверки BadRequest.
    pub fn call_raw(&mut self, line: &[u8]) -> Result<Response, RpcError> {
        self.writer.write_all(line)?;
        self.writer.flush()?;

        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf)?;
        if n == 0 {
            return Err(RpcError::Protocol("connection closed by server".into()));
        }
        serde_json::from_str(&buf).map_err(|e| RpcError::Protocol(format!("parse response: {}", e)))
    }

    fn call_typed<T: DeserializeOwned>(&mut self, req: &Request) -> Result<T, RpcError> {
        let resp = self.call(req)?;
        if !resp.ok {
            return Err(match resp.error {
                Some(e) => RpcError::Remote {
                    kind: e.kind,
                    message: e.message,
                },
                None => RpcError::Protocol("error response without error body".into()),
            });
        }
        let v = resp
            .result
            .ok_or_else(|| RpcError::Protocol("ok response without result".into()))?;
        serde_json::from_value(v).map_err(|e| RpcError::Protocol(format!("decode result: {}", e)))
    }

    pub fn append(&mut self, list_id: i64, value: i64) -> Result<(), RpcError> {
        let r: AppendReply = self.call_typed(&Request::Append { list_id, value })?;
        if r.ok {
            Ok(())
        } else {
            Err(RpcError::Protocol("append not acknowledged".into()))
        }
    }

    pub fn get(&mut self, list_id: i64, index: i64) -> Result<i64, RpcError> {
        let r: ValueReply = self.call_typed(&Request::Get { list_id, index })?;
        Ok(r.value)
    }

    pub fn remove(&mut self, list_id: i64) -> Result<i64, RpcError> {
        let r: ValueReply = self.call_typed(&Request::Remove { list_id })?;
        Ok(r.value)
    }

    pub fn size(&mut self, list_id: i64) -> Result<usize, RpcError> {
        let r: SizeReply = self.call_typed(&Request::Size { list_id })?;
        Ok(r.size)
    }

    pub fn get_all(&mut self) -> Result<ListsMap, RpcError> {
        let r: GetAllReply = self.call_typed(&Request::GetAll)?;
        Ok(r.lists)
    }
}
