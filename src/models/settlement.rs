use serde::Serialize;

/// 单个档位的分配结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierPrize {
    /// 该档位要求的命中数 (如 14/13/12)
    pub hits_required: u32,
    /// 命中该档位的票数
    pub winners: u64,
    /// 档位总额 (奖池 * 档位 bp)
    pub tier_total_cents: i64,
    /// 每票奖金; 无人中奖时为 0, 不做除零
    pub per_winner_cents: i64,
}

/// 一次奖池结算的完整分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSettlement {
    /// 结算基数 (本期销售额 + 上期结转)
    pub base_cents: i64,
    /// 进入奖池的部分
    pub pool_cents: i64,
    pub top: TierPrize,
    pub second: TierPrize,
    pub third: TierPrize,
    /// 实际分配出去的总额
    pub distributed_cents: i64,
    /// 奖池内未分配余额 (含无人中奖档位与整除余数), 按 unclaimed_policy 归属
    pub unclaimed_cents: i64,
}

impl PoolSettlement {
    /// 按命中数取每票奖金, 未达档位为 0
    pub fn prize_for_hits(&self, hits: u32) -> i64 {
        for tier in [&self.top, &self.second, &self.third] {
            if hits == tier.hits_required {
                return tier.per_winner_cents;
            }
        }
        0
    }
}

/// 单期结算汇总
#[derive(Debug, Clone, Serialize)]
pub struct SettlementSummary {
    pub draw_id: i64,
    pub tickets_settled: u64,
    pub winners: u64,
    pub total_collected_cents: i64,
    pub total_prize_cents: i64,
}
