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

#![allow(non_snake_case)]

use crate::ErrorCode;

macro_rules! build_exceptions {
    ($($(#[$meta:meta])* $body:ident($code:expr)),*$(,)*) => {
        impl ErrorCode {
            $(

                paste::item! {
                    $(
                        #[$meta]
                    )*
                    pub const [< $body:snake:upper >]: u16 = $code;
                }
                $(
                    #[$meta]
                )*
                pub fn $body(display_text: impl Into<String>) -> ErrorCode {
                    ErrorCode::create(
                        $code,
                        stringify!($body),
                        display_text.into(),
                    )
                }
            )*
        }
    }
}

// Core system errors [1000-1009]
build_exceptions! {
    /// Broken internal invariant; never expected to surface
    LogicalError(1001),
    /// Feature not implemented
    NotImplemented(1002),
    /// Syntax error in the query shape
    SyntaxError(1005),
    /// Invalid arguments
    BadArguments(1006),
    /// Value of an unexpected type
    TypeMismatch(1007),
}

// Semantic errors [1020-1069]
build_exceptions! {
    /// Number of arguments doesn't match
    NumberOfArgumentsDoesntMatch(1028),
    /// Column not found in the table
    NoSuchColumnInTable(1058),
    /// Operation not supported for this kind of join
    IncompatibleTypeOfJoin(1064),
    /// Join keys not expressible by any keyed structure
    UnsupportedJoinKeys(1065),
}

// Resource limits [2000-2009]
build_exceptions! {
    /// Build side exceeded the configured size limits
    SetSizeLimitExceeded(2001),
}
