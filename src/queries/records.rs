//! Read-only projections of contract state, shaped for the API.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::queries::time::{format_timestamp, DisplayTime};
use crate::queries::QueryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub nome: String,
    pub data_cadastro: String,
    pub ocupado: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRecord {
    pub nome_cliente: String,
    pub nome_carro: String,
    pub nome_posto: String,
    pub data_reserva: String,
    pub hora_reserva: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: u128,
    pub nome_cliente: String,
    pub nome_carro: String,
    pub nome_posto: String,
    pub valor: u128,
    pub data: String,
    pub hora: String,
}

/// Positional view over one decoded tuple.
struct Fields<'a> {
    record: &'static str,
    values: &'a [DynSolValue],
}

impl<'a> Fields<'a> {
    fn new(record: &'static str, value: &'a DynSolValue, arity: usize) -> Result<Self, QueryError> {
        let values = value
            .as_tuple()
            .ok_or_else(|| QueryError::Decode(format!("{record}: expected a tuple")))?;
        if values.len() != arity {
            return Err(QueryError::Decode(format!(
                "{record}: expected {arity} fields, got {}",
                values.len()
            )));
        }
        Ok(Self { record, values })
    }

    fn error(&self, index: usize, expected: &str) -> QueryError {
        QueryError::Decode(format!("{}: field {index} is not {expected}", self.record))
    }

    fn string(&self, index: usize) -> Result<String, QueryError> {
        self.values[index]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.error(index, "a string"))
    }

    fn boolean(&self, index: usize) -> Result<bool, QueryError> {
        self.values[index]
            .as_bool()
            .ok_or_else(|| self.error(index, "a bool"))
    }

    fn uint(&self, index: usize) -> Result<U256, QueryError> {
        self.values[index]
            .as_uint()
            .map(|(value, _)| value)
            .ok_or_else(|| self.error(index, "an unsigned integer"))
    }

    fn amount(&self, index: usize) -> Result<u128, QueryError> {
        u128::try_from(self.uint(index)?).map_err(|_| self.error(index, "within 128 bits"))
    }

    fn timestamp(&self, index: usize) -> Result<DisplayTime, QueryError> {
        u64::try_from(self.uint(index)?)
            .ok()
            .and_then(format_timestamp)
            .ok_or_else(|| self.error(index, "a valid timestamp"))
    }
}

impl StationRecord {
    /// `(string nome, uint256 dataCadastro, bool ocupado)`
    pub fn from_tuple(value: &DynSolValue) -> Result<Self, QueryError> {
        let fields = Fields::new("station", value, 3)?;
        Ok(Self {
            nome: fields.string(0)?,
            data_cadastro: fields.timestamp(1)?.date,
            ocupado: fields.boolean(2)?,
        })
    }
}

impl ReservationRecord {
    /// `(string nomeCliente, string nomeCarro, string nomePosto, uint256 dataReserva)`
    pub fn from_tuple(value: &DynSolValue) -> Result<Self, QueryError> {
        let fields = Fields::new("reservation", value, 4)?;
        let at = fields.timestamp(3)?;
        Ok(Self {
            nome_cliente: fields.string(0)?,
            nome_carro: fields.string(1)?,
            nome_posto: fields.string(2)?,
            data_reserva: at.date,
            hora_reserva: at.time,
        })
    }
}

impl PaymentRecord {
    /// `(uint256 id, string nomeCliente, string nomeCarro, string nomePosto, uint256 valor, uint256 data)`
    pub fn from_tuple(value: &DynSolValue) -> Result<Self, QueryError> {
        let fields = Fields::new("payment", value, 6)?;
        let at = fields.timestamp(5)?;
        Ok(Self {
            id: fields.amount(0)?,
            nome_cliente: fields.string(1)?,
            nome_carro: fields.string(2)?,
            nome_posto: fields.string(3)?,
            valor: fields.amount(4)?,
            data: at.date,
            hora: at.time,
        })
    }
}
