use std::sync::Arc;

use prost::Message;
use storage::AccessRecord;
use storage::DBColumnFamily;
use storage::RawKV;
use storage::WriteEntry;

use super::RsmError;
use super::StateMachine;
use crate::protocol::encode_msg;
use crate::protocol::Command;
use crate::protocol::KvReply;
use crate::protocol::OpCode;

/// KvStateMachine is a key-value map kept in the Record column family.
pub struct KvStateMachine {
    sto: Arc<dyn RawKV>,
}

impl KvStateMachine {
    pub fn new(sto: Arc<dyn RawKV>) -> KvStateMachine {
        KvStateMachine { sto }
    }

    fn exec(&self, cmd: &Command) -> Result<(Vec<WriteEntry>, KvReply), RsmError> {
        let op = match cmd.kind() {
            Some(op) => op,
            None => {
                return Ok((
                    vec![],
                    KvReply {
                        error: format!("unsupported op code: {}", cmd.op),
                        ..Default::default()
                    },
                ))
            }
        };

        let prev = match op {
            OpCode::NoOp => None,
            _ => self.sto.get_kv(&cmd.key)?,
        };

        let found = prev.is_some();
        let (writes, value) = match op {
            OpCode::NoOp => (vec![], vec![]),
            OpCode::Get => (vec![], prev.unwrap_or_default()),
            OpCode::Set => (
                vec![WriteEntry::Set(
                    DBColumnFamily::Record,
                    cmd.key.clone(),
                    cmd.value.clone(),
                )],
                vec![],
            ),
            OpCode::Delete => (
                vec![WriteEntry::Delete(DBColumnFamily::Record, cmd.key.clone())],
                vec![],
            ),
        };

        Ok((
            writes,
            KvReply {
                found,
                value,
                error: String::new(),
            },
        ))
    }
}

impl StateMachine for KvStateMachine {
    fn apply(&self, payload: &[u8]) -> Result<(Vec<WriteEntry>, Vec<u8>), RsmError> {
        let (writes, reply) = match Command::decode(payload) {
            Ok(cmd) => self.exec(&cmd)?,
            Err(e) => (
                vec![],
                KvReply {
                    error: format!("bad command: {}", e),
                    ..Default::default()
                },
            ),
        };

        Ok((writes, encode_msg(&reply)))
    }
}
