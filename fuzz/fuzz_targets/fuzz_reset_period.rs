// Copyright [2026] [RewardGate Contributors]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
#![no_main]

use libfuzzer_sys::fuzz_target;
use rewardgate_core::period::{ResetTime, DAY_MS};

fuzz_target!(|input: (u8, u8, u64, u64)| {
    let (hour, minute, last, now) = input;
    let Ok(reset) = ResetTime::new(hour, minute) else {
        return;
    };
    let now = now % (DAY_MS * 100_000);
    let start = reset.period_start(now);
    let next = reset.next_period_start(now);
    assert!(start <= now);
    assert!(now < next);
    assert_eq!(next - start, DAY_MS);
    assert_eq!(ResetTime::parse(&reset.to_string()).ok(), Some(reset));

    let last = last % (now + 1);
    assert_eq!(reset.claimed_this_period(last, now), last >= start);
});
