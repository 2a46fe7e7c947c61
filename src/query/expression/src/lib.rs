// Copyright 2023 Quarry Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The columnar layer consumed by the execution operators.
//!
//! Columns are immutable once published and cheap to clone; mutation goes
//! through `ColumnBuilder`. Nullable columns carry a byte null map where a
//! non-zero byte marks a NULL row.

mod block;
mod kernels;
mod types;
mod values;

pub use block::BlockEntry;
pub use block::DataBlock;
pub use block::Value;
pub use kernels::group_by_hash::choose_hash_method_with_types;
pub use kernels::group_by_hash::FixedKey;
pub use kernels::group_by_hash::HashMethodFixedKeys;
pub use kernels::group_by_hash::HashMethodKind;
pub use kernels::group_by_hash::HashMethodSerializer;
pub use kernels::group_by_hash::HashMethodSingleFixedString;
pub use kernels::group_by_hash::HashMethodSingleString;
pub use types::DataType;
pub use types::NumberDataType;
pub use values::Buffer;
pub use values::Column;
pub use values::ColumnBuilder;
pub use values::FixedStringColumn;
pub use values::NullableColumn;
pub use values::NumberColumn;
pub use values::NumberScalar;
pub use values::Scalar;
pub use values::ScalarRef;
pub use values::StringColumn;
