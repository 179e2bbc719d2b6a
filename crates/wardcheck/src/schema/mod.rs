//! Schema registry: declarative specifications for every dataset table.

mod registry;
mod table;
mod types;

pub use registry::{
    DETERIORATION_EVENT, DETERIORATION_HOUR, HOUR, LOS_HOURS, NEXT_12H_LABEL, NO_OXYGEN_DEVICE,
    OXYGEN_DEVICE, OXYGEN_DEVICES, OXYGEN_FLOW, PATIENT_ID, WITHIN_12H, get_table_spec,
    patient_static_columns,
};
pub use table::{TableName, TableSpec};
pub use types::{
    ColumnKind, ColumnSpec, Value, ValueRange, is_missing, parse_binary, parse_float,
    parse_integer,
};
